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

//! Error types for trailquery
//!
//! This module defines all error types used throughout the query compiler.

use thiserror::Error;

use crate::core::item::{FieldId, ItemWidth, ValId};

/// Result type alias for trailquery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for query compilation and store lookups
///
/// `NoSuchValue` is recoverable inside the filter compiler (it becomes an
/// always-true or always-false sentinel term); everything else is fatal to
/// the operation that raised it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Store lookup errors
    // =========================================================================
    /// Field name not present in the store
    #[error("no field named '{0}'")]
    NoSuchField(String),

    /// Value absent from a field's lexicon
    #[error("field '{field}' has no value '{value}'")]
    NoSuchValue { field: String, value: String },

    /// Field or value id does not fit the active item width
    #[error("field {field} / value id {val} does not fit {width:?} items")]
    ItemOverflow {
        field: FieldId,
        val: ValId,
        width: ItemWidth,
    },

    /// Trail id past the end of the store
    #[error("trail {0} out of range")]
    TrailOutOfRange(u64),

    /// Entity id (16-byte) not present in the store
    #[error("unknown entity id '{0}'")]
    UnknownEntity(String),

    /// Event value count does not match the store's field count
    #[error("expected {expected} values per event, got {got}")]
    FieldCountMismatch { expected: usize, got: usize },

    // =========================================================================
    // Query compilation errors
    // =========================================================================
    /// Expression failed to parse; carries the offending fragment
    #[error("malformed expression at offset {offset}: {message} near '{fragment}'")]
    MalformedExpression {
        message: String,
        fragment: String,
        offset: usize,
    },

    /// A structured filter document was not in the expected shape
    #[error("malformed filter spec: {0}")]
    MalformedFilterSpec(String),

    /// Bitmask CNF would need more terms than the mask width allows
    #[error("query needs {count} mask terms, the width allows {max}")]
    TooManyTerms { count: usize, max: usize },

    /// Funnel coordinates name a key combination that was never indexed
    #[error("no funnel indexed for key [{0}]")]
    UnknownFunnelKey(String),

    /// Funnel id past the end of the funnel table
    #[error("funnel {0} out of range")]
    FunnelOutOfRange(u64),

    // =========================================================================
    // Wire format errors
    // =========================================================================
    /// A flat filter array is inconsistent with its own length prefixes.
    /// Indicates storage corruption or an item-width mismatch; never
    /// silently truncated.
    #[error("corrupt filter: {0}")]
    CorruptFilter(String),

    /// A blob container failed structural validation
    #[error("corrupt blob: {0}")]
    CorruptBlob(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoSuchValue {
            field: "browser".to_string(),
            value: "netscape".to_string(),
        };
        assert_eq!(err.to_string(), "field 'browser' has no value 'netscape'");

        let err = Error::TooManyTerms { count: 70, max: 64 };
        assert_eq!(
            err.to_string(),
            "query needs 70 mask terms, the width allows 64"
        );
    }

    #[test]
    fn test_errors_are_comparable() {
        // compilers match on error variants to decide recoverability
        let a = Error::NoSuchField("x".to_string());
        let b = Error::NoSuchField("x".to_string());
        assert_eq!(a, b);
    }
}
