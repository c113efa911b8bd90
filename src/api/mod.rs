//! Remote lookup module for typeahead endpoints.
//!
//! This module provides the `LookupClient` for resolving search queries
//! against remote endpoints, behind the `LookupTransport` seam.
//!
//! The wire contract is `GET <endpoint>?search=<query>&limit=<n>` with a
//! JSON body that is either a bare option array or a `{ "data": [...] }`
//! envelope.

pub mod client;
pub mod error;

pub use client::{HttpTransport, LookupClient, LookupTransport};
pub use error::LookupError;
