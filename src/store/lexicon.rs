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

//! Per-field value dictionary
//!
//! Each value field owns a [`Lexicon`] mapping value strings to compact
//! value ids and back. Ids start at 1; id 0 is reserved for the empty
//! value, so a packed item is never the zero sentinel. Ids are assigned
//! once at ingestion and never change afterwards.

use std::collections::HashMap;

use crate::core::ValId;

/// Bidirectional value-string <-> value-id dictionary for one field
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    /// Value strings in id order; values[i] has id i + 1
    values: Vec<String>,
    /// Reverse lookup
    index: HashMap<String, ValId>,
}

impl Lexicon {
    /// Create an empty lexicon
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the id of a value, or assign the next free id.
    ///
    /// The empty string maps to the reserved id 0 and is never stored.
    pub fn intern(&mut self, value: &str) -> ValId {
        if value.is_empty() {
            return 0;
        }
        if let Some(&id) = self.index.get(value) {
            return id;
        }
        self.values.push(value.to_string());
        let id = self.values.len() as ValId;
        self.index.insert(value.to_string(), id);
        id
    }

    /// Id of a value, if present
    pub fn val_id(&self, value: &str) -> Option<ValId> {
        if value.is_empty() {
            return Some(0);
        }
        self.index.get(value).copied()
    }

    /// Value string for an id; id 0 is the empty value
    pub fn value(&self, id: ValId) -> Option<&str> {
        if id == 0 {
            return Some("");
        }
        self.values.get(id as usize - 1).map(String::as_str)
    }

    /// Number of distinct non-empty values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no value has been interned
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate values in id order (ids 1..)
    pub fn iter(&self) -> impl Iterator<Item = (ValId, &str)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as ValId + 1, v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_assigns_stable_ids() {
        let mut lex = Lexicon::new();
        assert_eq!(lex.intern("chrome"), 1);
        assert_eq!(lex.intern("firefox"), 2);
        assert_eq!(lex.intern("chrome"), 1);
        assert_eq!(lex.len(), 2);
    }

    #[test]
    fn test_empty_value_is_id_zero() {
        let mut lex = Lexicon::new();
        assert_eq!(lex.intern(""), 0);
        assert_eq!(lex.val_id(""), Some(0));
        assert_eq!(lex.value(0), Some(""));
        assert!(lex.is_empty());
    }

    #[test]
    fn test_lookup_roundtrip() {
        let mut lex = Lexicon::new();
        for v in ["a", "b", "c"] {
            lex.intern(v);
        }
        for (id, value) in lex.iter() {
            assert_eq!(lex.val_id(value), Some(id));
            assert_eq!(lex.value(id), Some(value));
        }
        assert_eq!(lex.val_id("missing"), None);
        assert_eq!(lex.value(7), None);
    }
}
