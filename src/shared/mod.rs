//! Shared reference-dataset loading.
//!
//! This module provides the `SharedDatasetRegistry` for datasets that
//! many fields need identically (positions, departments, categories):
//! each dataset is loaded once, cached process-wide, and every state
//! change is broadcast to all subscribed consumers.

pub mod registry;

pub use registry::{
    DatasetSpec, SharedDatasetRegistry, SharedSnapshot, SharedSubscription, SubscriberCallback,
};
