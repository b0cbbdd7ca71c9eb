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

//! Set evaluation
//!
//! [`SetIter`] walks a [`Set`] in ascending entity order. A simple set
//! scans its funnel's membership table directly; a complex set keeps one
//! child iterator per term and merges them: at each step the smallest
//! pending entity id is popped from every child that holds it, the popped
//! children form the membership mask the parent CNF is evaluated against.
//!
//! When a child that the CNF provably requires runs out, the whole
//! iterator is exhausted early; no remaining entity can pass.

use crate::core::Result;
use crate::funnel::db::{EntityId, FunnelData, FunnelDb, Mask};
use crate::funnel::set::{MaskCnf, Set};

/// One member of a set: an entity and its accumulated mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetElem {
    pub id: EntityId,
    pub mask: Mask,
}

/// Ordered iterator over a set's members
pub struct SetIter<'a> {
    state: State<'a>,
}

enum State<'a> {
    Simple {
        data: &'a FunnelData,
        cnf: &'a MaskCnf,
        index: usize,
    },
    Complex {
        children: Vec<SetIter<'a>>,
        /// Lookahead element per child; `None` once exhausted
        pending: Vec<Option<SetElem>>,
        cnf: &'a MaskCnf,
        /// Children still holding elements; zero ends iteration
        num_left: usize,
    },
}

impl<'a> SetIter<'a> {
    /// Open an iterator over `set` against `db`.
    ///
    /// Fails if the set references a funnel id the db does not have.
    pub fn new(db: &'a FunnelDb<'a>, set: &'a Set) -> Result<SetIter<'a>> {
        let state = match set {
            Set::Simple { funnel_id, cnf } => State::Simple {
                data: db.funnel(*funnel_id)?,
                cnf,
                index: 0,
            },
            Set::Complex { sets, cnf } => {
                let mut children = Vec::with_capacity(sets.len());
                for child in sets {
                    children.push(SetIter::new(db, child)?);
                }
                let pending: Vec<Option<SetElem>> =
                    children.iter_mut().map(|c| c.next()).collect();
                let mut num_left = pending.iter().flatten().count();
                for (i, slot) in pending.iter().enumerate() {
                    if slot.is_none() && cnf.requires(i as u32) {
                        num_left = 0;
                    }
                }
                State::Complex {
                    children,
                    pending,
                    cnf,
                    num_left,
                }
            }
        };
        Ok(SetIter { state })
    }
}

impl Iterator for SetIter<'_> {
    type Item = SetElem;

    fn next(&mut self) -> Option<SetElem> {
        match &mut self.state {
            State::Simple { data, cnf, index } => {
                while let Some((id, mask)) = data.slot(*index) {
                    *index += 1;
                    if cnf.eval(mask) {
                        return Some(SetElem { id, mask });
                    }
                }
                None
            }
            State::Complex {
                children,
                pending,
                cnf,
                num_left,
            } => {
                while *num_left > 0 {
                    let min = pending.iter().flatten().map(|e| e.id).min()?;
                    let mut membership: Mask = 0;
                    let mut mask: Mask = 0;
                    for i in 0..pending.len() {
                        let Some(elem) = pending[i].filter(|e| e.id == min) else {
                            continue;
                        };
                        membership |= 1 << i;
                        mask |= elem.mask;
                        pending[i] = children[i].next();
                        if pending[i].is_none() && *num_left > 0 {
                            *num_left -= 1;
                            if cnf.requires(i as u32) {
                                *num_left = 0;
                            }
                        }
                    }
                    if cnf.eval(membership) {
                        return Some(SetElem { id: min, mask });
                    }
                }
                None
            }
        }
    }
}
