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

//! # Trailquery - filter and funnel query compiler for event trails
//!
//! Trailquery compiles human-readable queries over an immutable event
//! store into compact numeric form and evaluates them. An event is a
//! timestamp plus one value per field; values are interned per field and
//! every (field, value) pair packs into a single numeric *item* code.
//! Queries are conjunctive normal form over items, evaluated either
//! per-event (filters) or per-entity against precomputed membership
//! bitmasks (funnels).
//!
//! ## Quick start
//!
//! ```rust
//! use trailquery::filter::{clause_specs, compile, decompile, parse, Dialect};
//! use trailquery::store::StoreBuilder;
//!
//! let mut cons = StoreBuilder::new(&["first", "second"]);
//! cons.add([0; 16], 100, &["500", "0"]).unwrap();
//! cons.add([0; 16], 101, &["7", "3"]).unwrap();
//! let store = cons.finalize();
//!
//! // parse, compile, match
//! let expr = parse("second=0 & first=500", Dialect::Query).unwrap();
//! let filter = compile(&store, &clause_specs(&expr).unwrap()).unwrap();
//! let matched = store.decode_trail(0, Some(&filter)).unwrap();
//! assert_eq!(matched, vec![(100, vec!["500", "0"])]);
//!
//! // the flat form decompiles back to the same clauses
//! assert_eq!(
//!     decompile(&store, &filter).unwrap(),
//!     clause_specs(&expr).unwrap()
//! );
//! ```
//!
//! ## Modules
//!
//! - [`core`] - item codec and the error taxonomy ([`Item`], [`Error`])
//! - [`store`] - in-memory trail store, lexicons, legacy blob container
//! - [`filter`] - CNF filters: structured specs, expression algebra,
//!   string parser, flat-array compiler
//! - [`funnel`] - precomputed membership indexes and set queries over
//!   them

pub mod core;
pub mod filter;
pub mod funnel;
pub mod store;

pub use crate::core::{Error, FieldId, Item, ItemWidth, Result, ValId};
pub use crate::filter::{Dialect, Expression, FlatFilter};
pub use crate::funnel::{FunnelDb, FunnelParams, Set};
pub use crate::store::{EventStore, StoreBuilder};
