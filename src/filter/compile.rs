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

//! Flat CNF filter compiler
//!
//! Compiles a structured clause list into the flat numeric array the scan
//! engine consumes, and decompiles it back. The layout per clause is
//!
//! ```text
//! [ term count | neg flag, item | neg flag, item | ... ]
//! ```
//!
//! where `term count` counts (flag, item) pairs. Clauses are conjoined;
//! terms within a clause are disjoined. An all-zero slot never appears
//! inside a clause, and zero-term clauses are dropped before
//! serialization.
//!
//! A term whose value (or field) does not resolve is not an error: it
//! compiles to the reserved [`Item::UNRESOLVABLE`] marker, making the term
//! always false under equality (a nonexistent value equals no event) and
//! always true under inequality.

use tracing::{debug, trace};

use crate::core::{Error, Item, ItemWidth, Result};
use crate::filter::spec::{ClauseSpec, TermOp, TermSpec};
use crate::store::EventStore;

/// Flag bit on the first slot of a term pair
const NEGATED: u64 = 1;

/// A compiled filter: the flat word array handed to the scan engine.
///
/// Immutable after construction; share freely across queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatFilter {
    words: Vec<u64>,
}

impl FlatFilter {
    /// The raw word array
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// True for the empty filter, which matches every event
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of clauses
    pub fn num_clauses(&self) -> usize {
        let mut n = 0;
        let mut i = 0;
        while i < self.words.len() {
            n += 1;
            i += 1 + 2 * self.words[i] as usize;
        }
        n
    }

    /// Evaluate the filter against one event's item slots.
    ///
    /// Every clause must have at least one satisfied term; the
    /// unresolvable marker is never present in an event.
    pub fn matches_event(&self, items: &[Item]) -> bool {
        let w = &self.words;
        let mut i = 0;
        while i < w.len() {
            let count = w[i] as usize;
            i += 1;
            let mut satisfied = false;
            for t in 0..count {
                let negated = w[i + 2 * t] & NEGATED != 0;
                let item = Item::from_raw(w[i + 2 * t + 1]);
                let present = item != Item::UNRESOLVABLE && items.contains(&item);
                if present != negated {
                    satisfied = true;
                    break;
                }
            }
            if !satisfied {
                return false;
            }
            i += 2 * count;
        }
        true
    }

    /// Serialize to little-endian bytes at the given item width.
    ///
    /// In `Narrow32` mode every word must fit 32 bits; the unresolvable
    /// marker maps to the all-ones 32-bit word.
    pub fn to_le_bytes(&self, width: ItemWidth) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.words.len() * width.word_size());
        for &word in &self.words {
            match width {
                ItemWidth::Extended => out.extend_from_slice(&word.to_le_bytes()),
                ItemWidth::Narrow32 => {
                    let narrow = if word == u64::MAX {
                        u32::MAX
                    } else {
                        u32::try_from(word).map_err(|_| {
                            Error::CorruptFilter(format!(
                                "word {word:#x} does not fit a 32-bit filter"
                            ))
                        })?
                    };
                    out.extend_from_slice(&narrow.to_le_bytes());
                }
            }
        }
        Ok(out)
    }

    /// Parse little-endian bytes at the given item width, validating the
    /// clause structure.
    pub fn from_le_bytes(width: ItemWidth, bytes: &[u8]) -> Result<FlatFilter> {
        let size = width.word_size();
        if bytes.len() % size != 0 {
            return Err(Error::CorruptFilter(format!(
                "{} bytes is not a whole number of {size}-byte words",
                bytes.len()
            )));
        }
        let words: Vec<u64> = bytes
            .chunks_exact(size)
            .map(|chunk| match width {
                ItemWidth::Extended => {
                    let mut b = [0u8; 8];
                    b.copy_from_slice(chunk);
                    u64::from_le_bytes(b)
                }
                ItemWidth::Narrow32 => {
                    let mut b = [0u8; 4];
                    b.copy_from_slice(chunk);
                    let w = u32::from_le_bytes(b);
                    // the marker widens back to the 64-bit all-ones form
                    if w == u32::MAX {
                        u64::MAX
                    } else {
                        w as u64
                    }
                }
            })
            .collect();
        let filter = FlatFilter { words };
        filter.validate()?;
        Ok(filter)
    }

    /// Check the clause-length structure of the word array.
    ///
    /// Compiled filters are valid by construction; this guards filters
    /// read from the wire. A length prefix overrunning the buffer means
    /// corruption or a width mismatch and must not be silently truncated.
    fn validate(&self) -> Result<()> {
        let w = &self.words;
        let mut i = 0;
        while i < w.len() {
            let count = w[i] as usize;
            if count == 0 {
                return Err(Error::CorruptFilter(format!(
                    "zero-term clause at word {i}"
                )));
            }
            let end = i
                .checked_add(1 + 2 * count)
                .ok_or_else(|| Error::CorruptFilter("clause length overflow".to_string()))?;
            if end > w.len() {
                return Err(Error::CorruptFilter(format!(
                    "clause at word {i} claims {count} terms past the buffer"
                )));
            }
            for t in 0..count {
                let flags = w[i + 1 + 2 * t];
                let item = w[i + 2 + 2 * t];
                if flags & !NEGATED != 0 {
                    return Err(Error::CorruptFilter(format!(
                        "bad term flags {flags:#x} at word {}",
                        i + 1 + 2 * t
                    )));
                }
                if item == 0 {
                    return Err(Error::CorruptFilter(format!(
                        "zero item inside clause at word {}",
                        i + 2 + 2 * t
                    )));
                }
            }
            i = end;
        }
        Ok(())
    }
}

/// Compile a structured clause list against a store.
///
/// Zero-term clauses impose no constraint and are dropped. Terms that do
/// not resolve degrade to the unresolvable marker instead of failing the
/// whole filter.
pub fn compile(store: &EventStore, clauses: &[ClauseSpec]) -> Result<FlatFilter> {
    let mut words = Vec::new();
    for clause in clauses {
        if clause.is_empty() {
            debug!("dropping empty clause");
            continue;
        }
        words.push(clause.terms.len() as u64);
        for term in &clause.terms {
            let flags = if term.op.is_negative() { NEGATED } else { 0 };
            let item = match store.resolve(&term.field, &term.value) {
                Ok(item) => item,
                Err(Error::NoSuchField(_)) | Err(Error::NoSuchValue { .. }) => {
                    debug!(
                        field = %term.field,
                        value = %term.value,
                        "unresolvable term, compiling sentinel"
                    );
                    Item::UNRESOLVABLE
                }
                Err(e) => return Err(e),
            };
            words.push(flags);
            words.push(item.raw());
        }
    }
    trace!(words = words.len(), "compiled filter");
    Ok(FlatFilter { words })
}

/// Decompile a flat filter back into structured clauses.
///
/// The exact inverse of [`compile`] for resolvable terms: clause and term
/// order, operators, and grouping are preserved. Unresolvable markers come
/// back as [`TermSpec::unresolvable`] sentinels, since the original text
/// is not recoverable from the marker.
pub fn decompile(store: &EventStore, filter: &FlatFilter) -> Result<Vec<ClauseSpec>> {
    filter.validate()?;
    let w = filter.words();
    let mut clauses = Vec::new();
    let mut i = 0;
    while i < w.len() {
        let count = w[i] as usize;
        i += 1;
        let mut terms = Vec::with_capacity(count);
        for _ in 0..count {
            let op = if w[i] & NEGATED != 0 {
                TermOp::NotEqual
            } else {
                TermOp::Equal
            };
            let item = Item::from_raw(w[i + 1]);
            if item == Item::UNRESOLVABLE {
                terms.push(TermSpec::unresolvable(op));
            } else {
                let (field, value) = store.decode(item)?;
                terms.push(TermSpec {
                    field: field.to_string(),
                    value: value.to_string(),
                    op,
                });
            }
            i += 2;
        }
        clauses.push(ClauseSpec { terms });
    }
    Ok(clauses)
}
