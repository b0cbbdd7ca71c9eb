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

//! Item codec
//!
//! An [`Item`] is a compact numeric code for one (field, value) pair inside
//! the event store. Two physical encodings share one numeric space,
//! discriminated by bit 7:
//!
//! ```text
//! Narrow (fits in 32 bits):
//!
//!   [ field | wide-flag=0 | val ]
//!     7       1             24
//!
//! Extended (64 bits):
//!
//!   [ field lo | wide-flag=1 | field hi | ext-flag | val ]
//!     7          1             7          1          48
//! ```
//!
//! The raw value `0` is the reserved "no value" sentinel used as a slot
//! terminator in decoded trails; it never denotes a real pair. The all-ones
//! value is reserved by the filter compiler as the unresolvable-value
//! marker.

use crate::core::{Error, Result};

/// Numeric field identifier (0 is the timestamp pseudo-field)
pub type FieldId = u32;

/// Numeric value identifier within one field's lexicon (0 means "no value")
pub type ValId = u64;

/// Largest field id representable in the narrow encoding
pub const FIELD32_MAX: FieldId = 127;

/// Largest value id representable in the narrow encoding
pub const VAL32_MAX: ValId = (1 << 24) - 1;

/// Largest field id representable in the extended encoding
pub const FIELD_MAX: FieldId = (1 << 14) - 1;

/// Largest value id representable in the extended encoding
pub const VAL_MAX: ValId = (1 << 48) - 1;

/// Item encoding width, selected once per store handle.
///
/// Legacy stores carry 32-bit items on the wire; current stores carry
/// 64-bit items and may use the extended field/value ranges. One codec
/// serves both; the width only bounds what [`ItemWidth::pack`] accepts and
/// how flat filters are serialized to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemWidth {
    /// 32-bit items: field <= 127, value id < 2^24
    Narrow32,
    /// 64-bit items: field < 2^14, value id < 2^48
    #[default]
    Extended,
}

/// A packed (field, value) code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item(u64);

impl Item {
    /// The "no value" sentinel; terminates event slots in decoded trails
    pub const NONE: Item = Item(0);

    /// Reserved marker for a value that does not exist in any lexicon.
    ///
    /// Never produced by [`ItemWidth::pack`]; the filter compiler emits it
    /// for terms whose value failed to resolve, so that one bad term does
    /// not poison a whole filter.
    pub const UNRESOLVABLE: Item = Item(u64::MAX);

    /// Wrap a raw item word (no validation; used when reading wire data)
    pub fn from_raw(raw: u64) -> Item {
        Item(raw)
    }

    /// The raw item word
    pub fn raw(self) -> u64 {
        self.0
    }

    /// True if this item uses the narrow encoding
    pub fn is_narrow(self) -> bool {
        self.0 & 128 == 0
    }

    /// Extract the field id, branching only on the discriminator bit
    pub fn field(self) -> FieldId {
        if self.is_narrow() {
            (self.0 & 127) as FieldId
        } else {
            ((self.0 & 127) | (((self.0 >> 8) & 127) << 7)) as FieldId
        }
    }

    /// Extract the value id, branching only on the discriminator bit
    pub fn val(self) -> ValId {
        if self.is_narrow() {
            (self.0 >> 8) & (u32::MAX as u64)
        } else {
            self.0 >> 16
        }
    }
}

impl ItemWidth {
    /// Pack a (field, value-id) pair into an item.
    ///
    /// `Narrow32` always produces the narrow form and fails with
    /// [`Error::ItemOverflow`] when the pair does not fit. `Extended`
    /// produces the narrow form when it fits and the extended form
    /// otherwise, so small stores keep compact items.
    pub fn pack(self, field: FieldId, val: ValId) -> Result<Item> {
        match self {
            ItemWidth::Narrow32 => {
                if field > FIELD32_MAX || val > VAL32_MAX {
                    return Err(Error::ItemOverflow { field, val, width: self });
                }
                Ok(Item(field as u64 | (val << 8)))
            }
            ItemWidth::Extended => {
                if field > FIELD_MAX || val > VAL_MAX {
                    return Err(Error::ItemOverflow { field, val, width: self });
                }
                if field <= FIELD32_MAX && val <= VAL32_MAX {
                    Ok(Item(field as u64 | (val << 8)))
                } else {
                    let lo = (field & 127) as u64;
                    let hi = ((field >> 7) as u64) << 8;
                    Ok(Item(lo | 128 | hi | (val << 16)))
                }
            }
        }
    }

    /// Number of bytes one flat-filter word occupies on the wire
    pub fn word_size(self) -> usize {
        match self {
            ItemWidth::Narrow32 => 4,
            ItemWidth::Extended => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_roundtrip() {
        let item = ItemWidth::Narrow32.pack(5, 1000).unwrap();
        assert!(item.is_narrow());
        assert_eq!(item.field(), 5);
        assert_eq!(item.val(), 1000);
    }

    #[test]
    fn test_extended_picks_narrow_form_when_possible() {
        let item = ItemWidth::Extended.pack(127, VAL32_MAX).unwrap();
        assert!(item.is_narrow());
        assert_eq!(item.field(), 127);
        assert_eq!(item.val(), VAL32_MAX);
    }

    #[test]
    fn test_extended_wide_form() {
        let item = ItemWidth::Extended.pack(200, 42).unwrap();
        assert!(!item.is_narrow());
        assert_eq!(item.field(), 200);
        assert_eq!(item.val(), 42);

        let item = ItemWidth::Extended.pack(3, VAL32_MAX + 1).unwrap();
        assert!(!item.is_narrow());
        assert_eq!(item.field(), 3);
        assert_eq!(item.val(), VAL32_MAX + 1);
    }

    #[test]
    fn test_extended_limits() {
        let item = ItemWidth::Extended.pack(FIELD_MAX, VAL_MAX).unwrap();
        assert_eq!(item.field(), FIELD_MAX);
        assert_eq!(item.val(), VAL_MAX);

        assert!(ItemWidth::Extended.pack(FIELD_MAX + 1, 0).is_err());
        assert!(ItemWidth::Extended.pack(0, VAL_MAX + 1).is_err());
    }

    #[test]
    fn test_narrow_rejects_overflow() {
        assert!(ItemWidth::Narrow32.pack(128, 0).is_err());
        assert!(ItemWidth::Narrow32.pack(0, VAL32_MAX + 1).is_err());
    }

    #[test]
    fn test_packed_item_is_never_a_sentinel() {
        // field 0 exists (timestamp pseudo-field) but value ids handed to
        // pack start at 1, so no packed item collides with Item::NONE
        let item = ItemWidth::Extended.pack(0, 1).unwrap();
        assert_ne!(item, Item::NONE);
        assert_ne!(item, Item::UNRESOLVABLE);
    }

    #[test]
    fn test_discriminator_bit() {
        // bit 7 of a wide item is always set, so field extraction does not
        // need any lexicon
        let wide = ItemWidth::Extended.pack(1 << 13, 1).unwrap();
        assert_eq!(wide.raw() & 128, 128);
        let narrow = ItemWidth::Extended.pack(1, 1).unwrap();
        assert_eq!(narrow.raw() & 128, 0);
    }
}
