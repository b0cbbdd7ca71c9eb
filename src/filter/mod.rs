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

//! Event filters
//!
//! Everything between a human-readable query and the flat numeric filter
//! the event store evaluates:
//!
//! - [`spec`]: the structured clause-list surface ([`TermSpec`],
//!   [`ClauseSpec`]) and its JSON form
//! - [`expr`]: the CNF expression algebra ([`Expression`], [`and_`],
//!   [`or_`], [`not_`])
//! - [`parse`]: the string surface, one entry point for both dialects
//! - [`compile`]: structured clauses to/from the flat filter array
//!
//! The two surfaces are equivalent by construction: a parsed expression
//! lowers through [`clause_specs`] into the same [`ClauseSpec`] list the
//! structured surface produces, and from there a single compiler applies.

pub mod compile;
pub mod expr;
pub mod parse;
pub mod spec;

pub use compile::{compile, decompile, FlatFilter};
pub use expr::{and_, not_, or_, Clause, Expression, Literal};
pub use parse::{clause_specs, parse, Dialect};
pub use spec::{clauses_from_json, clauses_to_json, ClauseSpec, TermOp, TermSpec};
