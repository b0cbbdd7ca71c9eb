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

//! Core types and definitions for trailquery
//!
//! This module contains the fundamental types used throughout the crate:
//!
//! - [`Item`] - packed (field, value) code with narrow/extended encodings
//! - [`ItemWidth`] - per-store item encoding configuration
//! - [`Error`] / [`Result`] - error types for all operations

pub mod error;
pub mod item;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use item::{FieldId, Item, ItemWidth, ValId};
