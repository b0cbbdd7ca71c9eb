// Copyright 2026 Trailquery Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Funnel queries
//!
//! Precomputed entity-membership indexes and the query machinery over
//! them:
//!
//! - [`db`]: building a [`FunnelDb`] over a finalized store and resolving
//!   funnel coordinates
//! - [`set`]: the compiled query form, [`Set`] trees over [`MaskCnf`]s
//! - [`iter`]: ordered-merge evaluation of a set
//! - [`combine`]: conjunction/disjunction/difference builders, Venn
//!   cardinalities and multi-query counting

pub mod combine;
pub mod db;
pub mod iter;
pub mod set;

pub use combine::{
    conjunction, count, count_family, count_set, difference, disjunction, venn, Venn,
};
pub use db::{EntityId, FunnelData, FunnelDb, FunnelId, FunnelParams, Mask, MAX_MASK_BITS};
pub use iter::{SetElem, SetIter};
pub use set::{MaskClause, MaskCnf, Set};
