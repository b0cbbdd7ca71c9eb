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

//! Queryable funnel sets
//!
//! A [`Set`] is what a funnel query compiles to. The leaf form pairs one
//! funnel with a [`MaskCnf`] over mask-field value bits; the complex form
//! combines child sets, its CNF read over *child membership* bits instead
//! of value bits. Sets are plain immutable data, built once per query and
//! freely shared afterwards.

use crate::core::{Error, Result};
use crate::funnel::db::{FunnelId, Mask, MAX_MASK_BITS};

/// One CNF clause over mask bits
///
/// Satisfied by a mask `m` when a positive term is present or a negated
/// term is absent: `(m & terms) != 0 || (!m & nterms) != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskClause {
    pub terms: Mask,
    pub nterms: Mask,
}

impl MaskClause {
    /// Whether the mask satisfies this clause
    pub fn satisfied_by(self, mask: Mask) -> bool {
        (mask & self.terms) != 0 || (!mask & self.nterms) != 0
    }
}

/// Conjunction of [`MaskClause`]s; empty means "no constraint"
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaskCnf {
    clauses: Vec<MaskClause>,
}

impl MaskCnf {
    /// The unconstrained CNF
    pub fn empty() -> Self {
        Self::default()
    }

    /// CNF from explicit clauses
    pub fn new(clauses: Vec<MaskClause>) -> Self {
        Self { clauses }
    }

    /// The clauses in order
    pub fn clauses(&self) -> &[MaskClause] {
        &self.clauses
    }

    /// True when no clause constrains the mask
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the CNF against a membership mask.
    ///
    /// The zero mask never passes: an entity with no bits set is not a
    /// member at all, constraint or no constraint.
    pub fn eval(&self, mask: Mask) -> bool {
        mask != 0 && self.clauses.iter().all(|c| c.satisfied_by(mask))
    }

    /// True when bit `i` is provably required for membership: some clause
    /// demands exactly that one positive term. Conservative on purpose;
    /// false only means "cannot prove", and callers use it for early
    /// exits.
    pub fn requires(&self, i: u32) -> bool {
        self.clauses
            .iter()
            .any(|c| c.terms == 1 << i && c.nterms == 0)
    }
}

/// A compiled funnel query
#[derive(Debug, Clone, PartialEq)]
pub enum Set {
    /// One funnel filtered by a CNF over mask-field value bits
    Simple { funnel_id: FunnelId, cnf: MaskCnf },
    /// Child sets combined by a CNF over child-index membership bits
    Complex { sets: Vec<Set>, cnf: MaskCnf },
}

impl Set {
    /// Leaf set over one funnel
    pub fn simple(funnel_id: FunnelId, cnf: MaskCnf) -> Set {
        Set::Simple { funnel_id, cnf }
    }

    /// Combine child sets under a membership CNF.
    ///
    /// At most [`MAX_MASK_BITS`] children fit one level; wider queries go
    /// through the bucketing combinators instead.
    pub fn complex(sets: Vec<Set>, cnf: MaskCnf) -> Result<Set> {
        if sets.len() > MAX_MASK_BITS {
            return Err(Error::TooManyTerms {
                count: sets.len(),
                max: MAX_MASK_BITS,
            });
        }
        Ok(Set::Complex { sets, cnf })
    }
}
