//! Per-field search state management.
//!
//! This module provides the `SearchField` handle for one mounted
//! selection field: debounced query submission, automatic cancellation
//! of superseded lookups, and reactive state fan-out to the rendering
//! layer.

pub mod handle;

pub use handle::{FieldSnapshot, SearchField};
