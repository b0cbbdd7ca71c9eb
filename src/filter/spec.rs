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

//! Structured filter specifications
//!
//! The structured query surface: a filter is a conjunction of
//! [`ClauseSpec`]s, each a disjunction of [`TermSpec`]s. The JSON shape
//! mirrors the historical client bindings:
//!
//! ```json
//! [{"a": ["a1", {"is_negative": true, "value": "a2"}]},
//!  {"b": ["b0"]}]
//! ```
//!
//! where each object is one clause, each key a field, and each array entry
//! either a plain value (equality) or an `is_negative` object (inequality).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{Error, Result};

/// Comparison operator of a filter term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermOp {
    /// Event value equals the term value
    #[default]
    Equal,
    /// Event value differs from the term value
    NotEqual,
}

impl TermOp {
    /// The opposite operator
    pub fn negated(self) -> TermOp {
        match self {
            TermOp::Equal => TermOp::NotEqual,
            TermOp::NotEqual => TermOp::Equal,
        }
    }

    /// True for [`TermOp::NotEqual`]
    pub fn is_negative(self) -> bool {
        self == TermOp::NotEqual
    }
}

/// One (field, value, op) term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSpec {
    pub field: String,
    pub value: String,
    #[serde(default)]
    pub op: TermOp,
}

impl TermSpec {
    /// Equality term
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            op: TermOp::Equal,
        }
    }

    /// Inequality term
    pub fn ne(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            op: TermOp::NotEqual,
        }
    }

    /// The decompiled form of a term whose value no longer resolves.
    ///
    /// With `op = Equal` this term is always false; with `op = NotEqual`
    /// it is always true.
    pub fn unresolvable(op: TermOp) -> Self {
        Self {
            field: String::new(),
            value: String::new(),
            op,
        }
    }

    /// True if this is the unresolvable sentinel form
    pub fn is_unresolvable(&self) -> bool {
        self.field.is_empty() && self.value.is_empty()
    }
}

/// One disjunctive clause of a structured filter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClauseSpec {
    pub terms: Vec<TermSpec>,
}

impl ClauseSpec {
    /// Clause from a list of terms
    pub fn new(terms: Vec<TermSpec>) -> Self {
        Self { terms }
    }

    /// True if the clause constrains nothing
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl From<Vec<TermSpec>> for ClauseSpec {
    fn from(terms: Vec<TermSpec>) -> Self {
        Self { terms }
    }
}

/// Parse the JSON clause-list surface into structured clauses
pub fn clauses_from_json(json: &str) -> Result<Vec<ClauseSpec>> {
    let doc: Value = serde_json::from_str(json)
        .map_err(|e| Error::MalformedFilterSpec(e.to_string()))?;
    let Value::Array(clauses) = doc else {
        return Err(Error::MalformedFilterSpec(
            "top level must be an array of clauses".to_string(),
        ));
    };
    clauses.iter().map(clause_from_value).collect()
}

fn clause_from_value(clause: &Value) -> Result<ClauseSpec> {
    let Value::Object(fields) = clause else {
        return Err(Error::MalformedFilterSpec(
            "each clause must be an object of field: [values]".to_string(),
        ));
    };
    let mut terms = Vec::new();
    for (field, values) in fields {
        let Value::Array(values) = values else {
            return Err(Error::MalformedFilterSpec(format!(
                "values of field '{field}' must be an array"
            )));
        };
        for value in values {
            terms.push(term_from_value(field, value)?);
        }
    }
    Ok(ClauseSpec { terms })
}

fn term_from_value(field: &str, value: &Value) -> Result<TermSpec> {
    match value {
        Value::String(s) => Ok(TermSpec::eq(field, s.as_str())),
        Value::Object(obj) => {
            let s = obj
                .get("value")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::MalformedFilterSpec(format!(
                        "term object of field '{field}' is missing 'value'"
                    ))
                })?;
            let negative = obj
                .get("is_negative")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if negative {
                Ok(TermSpec::ne(field, s))
            } else {
                Ok(TermSpec::eq(field, s))
            }
        }
        other => Err(Error::MalformedFilterSpec(format!(
            "unexpected term {other} in field '{field}'"
        ))),
    }
}

/// Render structured clauses back into the JSON clause-list surface
pub fn clauses_to_json(clauses: &[ClauseSpec]) -> String {
    let clauses: Vec<Value> = clauses
        .iter()
        .map(|clause| {
            let mut fields: Map<String, Value> = Map::new();
            for term in &clause.terms {
                let entry = fields
                    .entry(term.field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(values) = entry {
                    values.push(match term.op {
                        TermOp::Equal => Value::String(term.value.clone()),
                        TermOp::NotEqual => {
                            let mut obj = Map::new();
                            obj.insert("is_negative".to_string(), Value::Bool(true));
                            obj.insert("value".to_string(), Value::String(term.value.clone()));
                            Value::Object(obj)
                        }
                    });
                }
            }
            Value::Object(fields)
        })
        .collect();
    Value::Array(clauses).to_string()
}
