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

//! In-memory event store
//!
//! A finalized [`EventStore`] holds per-entity event trails keyed by a
//! 16-byte id, plus one [`Lexicon`] per value field. The store is strictly
//! read-only after [`StoreBuilder::finalize`]; item codes assigned at
//! ingestion are immutable, which is what lets compiled filters and funnel
//! sets be shared freely across concurrent queries.
//!
//! Field numbering follows the trail layout: field 0 is the timestamp
//! pseudo-field, value fields are numbered from 1 in declaration order.

pub mod blob;
pub mod lexicon;

use std::collections::HashMap;

use tracing::debug;

use crate::core::{Error, FieldId, Item, ItemWidth, Result, ValId};
use crate::filter::FlatFilter;

pub use lexicon::Lexicon;

/// 16-byte entity identifier
pub type Uuid = [u8; 16];

/// Per-store configuration, fixed at finalize time
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreConfig {
    /// Item encoding the store (and every filter compiled against it) uses
    pub item_width: ItemWidth,
}

/// One event: a timestamp plus one item slot per value field.
///
/// A slot packs value id 0 when the event carried the empty value for that
/// field; slots are never the raw zero sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub items: Vec<Item>,
}

/// The ordered event sequence for one entity
#[derive(Debug, Clone)]
pub struct Trail {
    pub uuid: Uuid,
    pub events: Vec<Event>,
}

/// Ingestion-side builder; the only place item codes are assigned
pub struct StoreBuilder {
    config: StoreConfig,
    field_names: Vec<String>,
    lexicons: Vec<Lexicon>,
    trails: Vec<Trail>,
    by_uuid: HashMap<Uuid, usize>,
}

impl StoreBuilder {
    /// Create a builder for the given value fields (the timestamp field is
    /// implicit)
    pub fn new(fields: &[&str]) -> Self {
        Self::with_config(fields, StoreConfig::default())
    }

    /// Create a builder with an explicit store configuration
    pub fn with_config(fields: &[&str], config: StoreConfig) -> Self {
        let mut field_names = Vec::with_capacity(fields.len() + 1);
        field_names.push("time".to_string());
        field_names.extend(fields.iter().map(|f| f.to_string()));
        Self {
            config,
            lexicons: vec![Lexicon::new(); fields.len()],
            field_names,
            trails: Vec::new(),
            by_uuid: HashMap::new(),
        }
    }

    /// Append one event to an entity's trail, interning its values.
    ///
    /// `values` must carry exactly one entry per declared value field; the
    /// empty string leaves that slot without an item.
    pub fn add(&mut self, uuid: Uuid, timestamp: u64, values: &[&str]) -> Result<()> {
        let num_fields = self.lexicons.len();
        if values.len() != num_fields {
            return Err(Error::FieldCountMismatch {
                expected: num_fields,
                got: values.len(),
            });
        }
        let width = self.config.item_width;
        let mut items = Vec::with_capacity(num_fields);
        for (i, value) in values.iter().enumerate() {
            let val: ValId = self.lexicons[i].intern(value);
            // the empty value packs as val id 0; the item stays nonzero
            // because value fields are numbered from 1
            items.push(width.pack(i as FieldId + 1, val)?);
        }
        let idx = match self.by_uuid.get(&uuid) {
            Some(&idx) => idx,
            None => {
                self.by_uuid.insert(uuid, self.trails.len());
                self.trails.push(Trail {
                    uuid,
                    events: Vec::new(),
                });
                self.trails.len() - 1
            }
        };
        self.trails[idx].events.push(Event { timestamp, items });
        Ok(())
    }

    /// Freeze the store. Events within each trail are ordered by timestamp
    /// (stable, so same-timestamp events keep insertion order).
    pub fn finalize(mut self) -> EventStore {
        for trail in &mut self.trails {
            trail.events.sort_by_key(|e| e.timestamp);
        }
        let num_events = self.trails.iter().map(|t| t.events.len() as u64).sum();
        debug!(
            trails = self.trails.len(),
            events = num_events,
            "finalized event store"
        );
        EventStore {
            config: self.config,
            field_names: self.field_names,
            lexicons: self.lexicons,
            trails: self.trails,
            by_uuid: self.by_uuid,
            num_events,
        }
    }
}

/// A finalized, read-only trail store
pub struct EventStore {
    config: StoreConfig,
    field_names: Vec<String>,
    lexicons: Vec<Lexicon>,
    trails: Vec<Trail>,
    by_uuid: HashMap<Uuid, usize>,
    num_events: u64,
}

impl EventStore {
    /// The store's item encoding width
    pub fn item_width(&self) -> ItemWidth {
        self.config.item_width
    }

    /// Number of entities
    pub fn num_trails(&self) -> u64 {
        self.trails.len() as u64
    }

    /// Total number of events across all trails
    pub fn num_events(&self) -> u64 {
        self.num_events
    }

    /// Field names, timestamp pseudo-field first
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Numeric id of a value field.
    ///
    /// The timestamp pseudo-field is not addressable here: filters and
    /// funnels operate on value fields only.
    pub fn field_id(&self, name: &str) -> Result<FieldId> {
        self.field_names
            .iter()
            .skip(1)
            .position(|f| f == name)
            .map(|i| i as FieldId + 1)
            .ok_or_else(|| Error::NoSuchField(name.to_string()))
    }

    /// Name of a field id
    pub fn field_name(&self, field: FieldId) -> Result<&str> {
        self.field_names
            .get(field as usize)
            .map(String::as_str)
            .ok_or_else(|| Error::NoSuchField(format!("#{field}")))
    }

    fn lexicon(&self, field: FieldId) -> Result<&Lexicon> {
        if field == 0 || field as usize > self.lexicons.len() {
            return Err(Error::NoSuchField(format!("#{field}")));
        }
        Ok(&self.lexicons[field as usize - 1])
    }

    /// Number of distinct non-empty values a field has seen
    pub fn lexicon_len(&self, name: &str) -> Result<usize> {
        Ok(self.lexicon(self.field_id(name)?)?.len())
    }

    /// Value id of a value string within a field's lexicon
    pub fn val_id(&self, field: FieldId, value: &str) -> Result<ValId> {
        self.lexicon(field)?.val_id(value).ok_or_else(|| {
            let field = self.field_name(field).unwrap_or("?").to_string();
            Error::NoSuchValue {
                field,
                value: value.to_string(),
            }
        })
    }

    /// Resolve a (field-name, value) pair to its item code
    ///
    /// Fails with [`Error::NoSuchField`] / [`Error::NoSuchValue`]; never
    /// allocates a new id.
    pub fn resolve(&self, field: &str, value: &str) -> Result<Item> {
        let fid = self.field_id(field)?;
        let val = self.val_id(fid, value)?;
        self.config.item_width.pack(fid, val)
    }

    /// Decode an item back to its (field-name, value) pair.
    ///
    /// Lossless for any item produced by [`EventStore::resolve`].
    pub fn decode(&self, item: Item) -> Result<(&str, &str)> {
        let field = item.field();
        let name = self.field_name(field)?;
        let value = self
            .lexicon(field)?
            .value(item.val())
            .ok_or(Error::CorruptFilter(format!(
                "item {:#x} has value id {} past lexicon of field '{}'",
                item.raw(),
                item.val(),
                name
            )))?;
        Ok((name, value))
    }

    /// Value string for a (field, value-id) pair
    pub fn value(&self, field: FieldId, val: ValId) -> Result<&str> {
        self.lexicon(field)?.value(val).ok_or_else(|| {
            let field = self.field_name(field).unwrap_or("?").to_string();
            Error::NoSuchValue {
                field,
                value: format!("#{val}"),
            }
        })
    }

    /// Trail id for an entity id
    pub fn trail_id(&self, uuid: &Uuid) -> Result<u64> {
        self.by_uuid
            .get(uuid)
            .map(|&i| i as u64)
            .ok_or_else(|| Error::UnknownEntity(hex(uuid)))
    }

    /// Entity id for a trail id
    pub fn uuid(&self, trail_id: u64) -> Result<&Uuid> {
        self.trails
            .get(trail_id as usize)
            .map(|t| &t.uuid)
            .ok_or(Error::TrailOutOfRange(trail_id))
    }

    /// Raw events of one trail
    pub fn trail(&self, trail_id: u64) -> Result<&[Event]> {
        self.trails
            .get(trail_id as usize)
            .map(|t| t.events.as_slice())
            .ok_or(Error::TrailOutOfRange(trail_id))
    }

    /// Iterate all trails in id order
    pub fn trails(&self) -> impl Iterator<Item = &Trail> {
        self.trails.iter()
    }

    /// Decode one trail to (timestamp, values), restricted to events
    /// matching the compiled filter when one is given.
    ///
    /// Each call owns its output buffer; nothing is shared between
    /// concurrent decodes.
    pub fn decode_trail(
        &self,
        trail_id: u64,
        filter: Option<&FlatFilter>,
    ) -> Result<Vec<(u64, Vec<&str>)>> {
        let events = self.trail(trail_id)?;
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            if let Some(f) = filter {
                if !f.matches_event(&event.items) {
                    continue;
                }
            }
            let mut values = Vec::with_capacity(event.items.len());
            for (i, &item) in event.items.iter().enumerate() {
                values.push(self.value(i as FieldId + 1, item.val())?);
            }
            out.push((event.timestamp, values));
        }
        Ok(out)
    }
}

fn hex(uuid: &Uuid) -> String {
    uuid.iter().map(|b| format!("{b:02x}")).collect()
}
