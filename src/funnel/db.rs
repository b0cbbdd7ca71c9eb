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

//! Funnel database
//!
//! A [`FunnelDb`] precomputes, for each combination of key-field values,
//! the set of entities whose trails carry that combination, together with
//! a bitmask of which mask-field values each entity was seen with. One
//! funnel exists for every point of each key group's value space (the
//! empty group yields a single global funnel), laid out as a row-major
//! index with precomputed group offsets.
//!
//! Per funnel the membership table is either *dense* (one mask slot per
//! entity, implicit ids) or *sparse* (explicit ascending (id, mask)
//! pairs), whichever is smaller.

use std::collections::HashMap;

use tracing::debug;

use crate::core::{Error, FieldId, Result};
use crate::filter::Expression;
use crate::funnel::set::{MaskClause, MaskCnf};
use crate::store::EventStore;

/// Index of one funnel within a [`FunnelDb`]
pub type FunnelId = u64;

/// Entity (trail) id as stored in funnel membership tables
pub type EntityId = u32;

/// Bitmask of mask-field value ids an entity was seen with
pub type Mask = u64;

/// Width of [`Mask`], the hard bound on distinct mask terms
pub const MAX_MASK_BITS: usize = 64;

/// What to index: one funnel space per key group, over one mask field
#[derive(Debug, Clone, Default)]
pub struct FunnelParams {
    /// Key field groups; each group indexes the cross product of its
    /// fields' value spaces. An empty group indexes a single funnel
    /// covering every entity.
    pub key_groups: Vec<Vec<String>>,
    /// Field whose value ids become mask bit positions
    pub mask_field: String,
}

/// Membership table of one funnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunnelData {
    /// One mask per entity, indexed by entity id; zero means absent
    Dense(Vec<Mask>),
    /// Explicit (entity, mask) pairs in ascending entity order
    Sparse(Vec<(EntityId, Mask)>),
}

impl FunnelData {
    /// Number of stored slots (entities for dense, members for sparse)
    pub fn len(&self) -> usize {
        match self {
            FunnelData::Dense(masks) => masks.len(),
            FunnelData::Sparse(elems) => elems.len(),
        }
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot at a raw table index; dense ids are implicit
    pub(crate) fn slot(&self, index: usize) -> Option<(EntityId, Mask)> {
        match self {
            FunnelData::Dense(masks) => masks.get(index).map(|&m| (index as EntityId, m)),
            FunnelData::Sparse(elems) => elems.get(index).copied(),
        }
    }
}

/// One key group: its fields in declaration order, the stride of each
/// field in the row-major index, and the group's base offset.
#[derive(Debug, Clone)]
struct KeyGroup {
    fields: Vec<FieldId>,
    strides: Vec<u64>,
    offset: FunnelId,
}

/// Precomputed funnel membership over a finalized store
pub struct FunnelDb<'a> {
    store: &'a EventStore,
    mask_field: FieldId,
    groups: Vec<KeyGroup>,
    /// Sorted key-field sets to group index
    by_key: HashMap<Vec<FieldId>, usize>,
    funnels: Vec<FunnelData>,
}

impl<'a> FunnelDb<'a> {
    /// Index the store per `params`.
    ///
    /// Fails with [`Error::TooManyTerms`] if the mask field's value space
    /// does not fit [`MAX_MASK_BITS`] bit positions, and with
    /// [`Error::NoSuchField`] for unknown key or mask fields.
    pub fn build(store: &'a EventStore, params: &FunnelParams) -> Result<Self> {
        let mask_field = store.field_id(&params.mask_field)?;
        // value id 0 (the empty value) occupies a bit position too
        let mask_dim = store.lexicon_len(&params.mask_field)? + 1;
        if mask_dim > MAX_MASK_BITS {
            return Err(Error::TooManyTerms {
                count: mask_dim,
                max: MAX_MASK_BITS,
            });
        }

        let mut groups = Vec::with_capacity(params.key_groups.len());
        let mut by_key = HashMap::new();
        let mut num_funnels: FunnelId = 0;
        for names in &params.key_groups {
            let mut fields = Vec::with_capacity(names.len());
            let mut strides = Vec::with_capacity(names.len());
            let mut size: u64 = 1;
            for name in names {
                fields.push(store.field_id(name)?);
                strides.push(size);
                size *= store.lexicon_len(name)? as u64 + 1;
            }
            let mut key = fields.clone();
            key.sort_unstable();
            by_key.insert(key, groups.len());
            groups.push(KeyGroup {
                fields,
                strides,
                offset: num_funnels,
            });
            num_funnels += size;
        }

        let db = Self {
            store,
            mask_field,
            groups,
            by_key,
            funnels: Vec::new(),
        };
        Ok(db.populate(num_funnels))
    }

    /// Scan every trail once, accumulating per-funnel membership, then
    /// pick the smaller of the dense and sparse layouts per funnel.
    fn populate(mut self, num_funnels: FunnelId) -> Self {
        let mut sparse: Vec<Vec<(EntityId, Mask)>> = vec![Vec::new(); num_funnels as usize];
        for (trail_id, trail) in self.store.trails().enumerate() {
            let id = trail_id as EntityId;
            for event in &trail.events {
                let bits: Mask = 1 << event.items[self.mask_field as usize - 1].val();
                for group in &self.groups {
                    let mut key = group.offset;
                    for (&field, &stride) in group.fields.iter().zip(&group.strides) {
                        key += event.items[field as usize - 1].val() * stride;
                    }
                    let elems = &mut sparse[key as usize];
                    match elems.last_mut() {
                        Some(last) if last.0 == id => last.1 |= bits,
                        _ => elems.push((id, bits)),
                    }
                }
            }
        }

        let num_entities = self.store.num_trails() as usize;
        let elem_size = std::mem::size_of::<(EntityId, Mask)>();
        let mask_size = std::mem::size_of::<Mask>();
        self.funnels = sparse
            .into_iter()
            .map(|elems| {
                if elems.len() * elem_size > num_entities * mask_size {
                    let mut masks = vec![0; num_entities];
                    for (id, mask) in elems {
                        masks[id as usize] = mask;
                    }
                    FunnelData::Dense(masks)
                } else {
                    FunnelData::Sparse(elems)
                }
            })
            .collect();
        debug!(
            funnels = self.funnels.len(),
            dense = self
                .funnels
                .iter()
                .filter(|f| matches!(f, FunnelData::Dense(_)))
                .count(),
            "built funnel db"
        );
        self
    }

    /// The store this db indexes
    pub fn store(&self) -> &EventStore {
        self.store
    }

    /// Field whose value ids are mask bit positions
    pub fn mask_field(&self) -> FieldId {
        self.mask_field
    }

    /// Total number of funnels across all key groups
    pub fn num_funnels(&self) -> u64 {
        self.funnels.len() as u64
    }

    /// Membership table of one funnel
    pub fn funnel(&self, id: FunnelId) -> Result<&FunnelData> {
        self.funnels
            .get(id as usize)
            .ok_or(Error::FunnelOutOfRange(id))
    }

    /// Funnel id of one (key field, value) coordinate combination.
    ///
    /// The fields named must exactly match one indexed key group (in any
    /// order); otherwise [`Error::UnknownFunnelKey`]. A value absent from
    /// its field's lexicon fails the same way: no funnel was indexed for
    /// it.
    pub fn resolve_funnel(&self, coords: &[(&str, &str)]) -> Result<FunnelId> {
        let unknown = || {
            Error::UnknownFunnelKey(
                coords
                    .iter()
                    .map(|(f, v)| format!("{f}={v}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };
        let mut fields = Vec::with_capacity(coords.len());
        for (name, _) in coords {
            fields.push(self.store.field_id(name)?);
        }
        let mut key = fields.clone();
        key.sort_unstable();
        let group = &self.groups[*self.by_key.get(&key).ok_or_else(unknown)?];

        let mut id = group.offset;
        for (&field, &stride) in group.fields.iter().zip(&group.strides) {
            let value = coords
                .iter()
                .zip(&fields)
                .find_map(|((_, v), &f)| (f == field).then_some(*v))
                .ok_or_else(unknown)?;
            let val = self
                .store
                .val_id(field, value)
                .map_err(|_| unknown())?;
            id += val * stride;
        }
        Ok(id)
    }

    /// Mask bit position of a term: its value id in the mask field's
    /// lexicon. Unknown terms surface [`Error::NoSuchValue`]; a value id
    /// past the mask width is [`Error::TooManyTerms`].
    pub fn mask_bit(&self, term: &str) -> Result<u32> {
        let val = self.store.val_id(self.mask_field, term)? as usize;
        if val >= MAX_MASK_BITS {
            return Err(Error::TooManyTerms {
                count: val + 1,
                max: MAX_MASK_BITS,
            });
        }
        Ok(val as u32)
    }

    /// Compile a CNF expression over mask terms into bitmask clauses.
    ///
    /// Bit i of a clause's `terms` (`nterms` when negated) is set for a
    /// literal whose term has value id i.
    pub fn compile_mask_cnf(&self, expr: &Expression) -> Result<MaskCnf> {
        let mut clauses = Vec::with_capacity(expr.len());
        for clause in expr.clauses() {
            let mut compiled = MaskClause::default();
            for lit in clause.literals() {
                let bit = 1u64 << self.mask_bit(&lit.term)?;
                if lit.negated {
                    compiled.nterms |= bit;
                } else {
                    compiled.terms |= bit;
                }
            }
            clauses.push(compiled);
        }
        Ok(MaskCnf::new(clauses))
    }
}
