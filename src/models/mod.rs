//! Data models for searchable selection fields.
//!
//! The only entity this crate deals in is the normalized option: every
//! source, cache entry, and consumer snapshot is expressed in terms of
//! `SearchOption`.

pub mod option;

pub use option::{default_transform, OptionId, OptionTransform, SearchOption};
