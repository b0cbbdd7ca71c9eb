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

//! Legacy blob container
//!
//! The export format older tooling consumes. Four contiguous sections, all
//! integers little-endian u32, all strings length-prefixed:
//!
//! ```text
//! HEADER  [ body offset | fields offset | lexicon offset ]
//! BODY    per entity: 16-byte id, event count,
//!         per event: timestamp + one item slot per value field
//! FIELDS  length-prefixed field names, timestamp field first
//! LEXICON (item, length-prefixed value string) pairs
//! ```
//!
//! The container predates extended items, so encoding fails if any item
//! does not fit 32 bits.

use std::collections::HashMap;

use crate::core::{Error, Item, ItemWidth, Result};
use crate::store::{EventStore, StoreBuilder, StoreConfig, Uuid};

const HEADER_SIZE: usize = 12;

/// Serialize a store into the legacy blob container
pub fn encode(store: &EventStore) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    for trail in store.trails() {
        body.extend_from_slice(&trail.uuid);
        put_u32(&mut body, trail.events.len() as u64, "event count")?;
        for event in &trail.events {
            put_u32(&mut body, event.timestamp, "timestamp")?;
            for &item in &event.items {
                // legacy convention: an empty value writes a zero slot
                let raw = if item.val() == 0 { 0 } else { item.raw() };
                put_u32(&mut body, raw, "item")?;
            }
        }
    }

    let mut fields = Vec::new();
    for name in store.field_names() {
        put_str(&mut fields, name)?;
    }

    let mut lexicon = Vec::new();
    for (fid, name) in store.field_names().iter().enumerate().skip(1) {
        for val in 1..=store.lexicon_len(name)? as u64 {
            let item = ItemWidth::Narrow32.pack(fid as u32, val)?;
            put_u32(&mut lexicon, item.raw(), "lexicon item")?;
            put_str(&mut lexicon, store.value(fid as u32, val)?)?;
        }
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len() + fields.len() + lexicon.len());
    let mut offs = HEADER_SIZE as u64;
    for section in [&body, &fields, &lexicon] {
        put_u32(&mut out, offs, "section offset")?;
        offs += section.len() as u64;
    }
    out.extend_from_slice(&body);
    out.extend_from_slice(&fields);
    out.extend_from_slice(&lexicon);
    Ok(out)
}

/// Parse a legacy blob back into a (narrow-width) store.
///
/// Structural inconsistencies (offsets out of order, sections overrunning
/// the buffer, items missing from the lexicon) are fatal.
pub fn decode(blob: &[u8]) -> Result<EventStore> {
    if blob.len() < HEADER_SIZE {
        return Err(Error::CorruptBlob("shorter than its header".to_string()));
    }
    let body_offs = get_u32(blob, 0)? as usize;
    let fields_offs = get_u32(blob, 4)? as usize;
    let lexicon_offs = get_u32(blob, 8)? as usize;
    if body_offs != HEADER_SIZE || fields_offs < body_offs || lexicon_offs < fields_offs {
        return Err(Error::CorruptBlob("section offsets out of order".to_string()));
    }
    if lexicon_offs > blob.len() {
        return Err(Error::CorruptBlob("sections overrun the buffer".to_string()));
    }

    let field_names = decode_fields(&blob[fields_offs..lexicon_offs])?;
    if field_names.is_empty() {
        return Err(Error::CorruptBlob("no fields".to_string()));
    }
    let lexicon = decode_lexicon(&blob[lexicon_offs..])?;

    let fields: Vec<&str> = field_names.iter().skip(1).map(String::as_str).collect();
    let mut cons = StoreBuilder::with_config(
        &fields,
        StoreConfig {
            item_width: ItemWidth::Narrow32,
        },
    );

    let body = &blob[body_offs..fields_offs];
    let mut offs = 0;
    let mut values: Vec<&str> = Vec::with_capacity(fields.len());
    while offs < body.len() {
        if offs + 16 > body.len() {
            return Err(Error::CorruptBlob("truncated entity id".to_string()));
        }
        let mut uuid: Uuid = [0; 16];
        uuid.copy_from_slice(&body[offs..offs + 16]);
        offs += 16;
        let num_events = get_u32(body, offs)?;
        offs += 4;
        for _ in 0..num_events {
            let timestamp = get_u32(body, offs)?;
            offs += 4;
            values.clear();
            for _ in 0..fields.len() {
                let raw = get_u32(body, offs)?;
                offs += 4;
                if raw == 0 {
                    values.push("");
                } else {
                    values.push(lexicon.get(&raw).map(String::as_str).ok_or_else(|| {
                        Error::CorruptBlob(format!("item {raw:#x} missing from lexicon"))
                    })?);
                }
            }
            cons.add(uuid, timestamp, &values)?;
        }
    }
    Ok(cons.finalize())
}

fn decode_fields(data: &[u8]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut offs = 0;
    while offs < data.len() {
        let (next, name) = get_str(data, offs)?;
        names.push(name);
        offs = next;
    }
    Ok(names)
}

fn decode_lexicon(data: &[u8]) -> Result<HashMap<u64, String>> {
    let mut lexicon = HashMap::new();
    let mut offs = 0;
    while offs < data.len() {
        let item = get_u32(data, offs)?;
        let (next, value) = get_str(data, offs + 4)?;
        if Item::from_raw(item) == Item::NONE {
            return Err(Error::CorruptBlob("zero item in lexicon".to_string()));
        }
        lexicon.insert(item, value);
        offs = next;
    }
    Ok(lexicon)
}

fn put_u32(out: &mut Vec<u8>, v: u64, what: &str) -> Result<()> {
    let v = u32::try_from(v)
        .map_err(|_| Error::CorruptBlob(format!("{what} {v} does not fit the legacy container")))?;
    out.extend_from_slice(&v.to_le_bytes());
    Ok(())
}

fn put_str(out: &mut Vec<u8>, s: &str) -> Result<()> {
    put_u32(out, s.len() as u64, "string length")?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn get_u32(data: &[u8], offs: usize) -> Result<u64> {
    let end = offs
        .checked_add(4)
        .filter(|&e| e <= data.len())
        .ok_or_else(|| Error::CorruptBlob("truncated integer".to_string()))?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offs..end]);
    Ok(u32::from_le_bytes(bytes) as u64)
}

fn get_str(data: &[u8], offs: usize) -> Result<(usize, String)> {
    let len = get_u32(data, offs)? as usize;
    let start = offs + 4;
    let end = start
        .checked_add(len)
        .filter(|&e| e <= data.len())
        .ok_or_else(|| Error::CorruptBlob("truncated string".to_string()))?;
    let s = std::str::from_utf8(&data[start..end])
        .map_err(|_| Error::CorruptBlob("non-utf8 string".to_string()))?;
    Ok((end, s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(n: u8) -> Uuid {
        let mut u = [0u8; 16];
        u[15] = n;
        u
    }

    fn sample_store() -> EventStore {
        let mut cons = StoreBuilder::with_config(
            &["a", "b"],
            StoreConfig {
                item_width: ItemWidth::Narrow32,
            },
        );
        cons.add(uuid(1), 100, &["a0", "b0"]).unwrap();
        cons.add(uuid(1), 101, &["a1", ""]).unwrap();
        cons.add(uuid(2), 55, &["a0", "b1"]).unwrap();
        cons.finalize()
    }

    #[test]
    fn test_blob_roundtrip() {
        let store = sample_store();
        let blob = encode(&store).unwrap();
        let decoded = decode(&blob).unwrap();

        assert_eq!(decoded.num_trails(), store.num_trails());
        assert_eq!(decoded.num_events(), store.num_events());
        assert_eq!(decoded.field_names(), store.field_names());
        for id in 0..store.num_trails() {
            assert_eq!(
                decoded.decode_trail(id, None).unwrap(),
                store.decode_trail(id, None).unwrap()
            );
        }
    }

    #[test]
    fn test_blob_reencode_is_identical() {
        // lexicon ids are assigned in first-appearance order on both
        // sides, so a decode/encode cycle reproduces the exact bytes
        let blob = encode(&sample_store()).unwrap();
        let again = encode(&decode(&blob).unwrap()).unwrap();
        assert_eq!(blob, again);
    }

    #[test]
    fn test_blob_header_offsets() {
        let blob = encode(&sample_store()).unwrap();
        assert_eq!(get_u32(&blob, 0).unwrap(), 12);
        let fields_offs = get_u32(&blob, 4).unwrap() as usize;
        let lexicon_offs = get_u32(&blob, 8).unwrap() as usize;
        assert!(fields_offs > 12);
        assert!(lexicon_offs > fields_offs);
        assert!(lexicon_offs <= blob.len());
    }

    #[test]
    fn test_truncated_blob_is_fatal() {
        let blob = encode(&sample_store()).unwrap();
        assert!(matches!(
            decode(&blob[..blob.len() - 3]),
            Err(Error::CorruptBlob(_))
        ));
        assert!(matches!(decode(&blob[..8]), Err(Error::CorruptBlob(_))));
    }

    #[test]
    fn test_unknown_item_is_fatal() {
        let mut blob = encode(&sample_store()).unwrap();
        // first item slot of the first event: header + uuid + count + timestamp
        let offs = HEADER_SIZE + 16 + 4 + 4;
        let bogus = ItemWidth::Narrow32.pack(1, 77).unwrap().raw() as u32;
        blob[offs..offs + 4].copy_from_slice(&bogus.to_le_bytes());
        assert!(matches!(decode(&blob), Err(Error::CorruptBlob(_))));
    }

    #[test]
    fn test_garbage_offsets_are_fatal() {
        let mut blob = encode(&sample_store()).unwrap();
        // swap fields/lexicon offsets
        let fields = blob[4..8].to_vec();
        let lexicon = blob[8..12].to_vec();
        blob[4..8].copy_from_slice(&lexicon);
        blob[8..12].copy_from_slice(&fields);
        assert!(matches!(decode(&blob), Err(Error::CorruptBlob(_))));
    }
}
