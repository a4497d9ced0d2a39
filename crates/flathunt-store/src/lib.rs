//! # Flathunt Store
//!
//! The shared coordination store agents use to hand artifacts to each
//! other. Every write creates a new immutable version of its key;
//! readers can fetch the latest, pin an exact version, block until a
//! minimum version exists, or stream future writes.
//!
//! [`NamespacedStore`] scopes a store handle to one pipeline run so
//! concurrent runs never collide on the shared semantic keys.

pub mod namespaced;
pub mod store;

pub use namespaced::NamespacedStore;
pub use store::{CoordinationRecord, CoordinationStore, RecordStream, StoreEvent};
