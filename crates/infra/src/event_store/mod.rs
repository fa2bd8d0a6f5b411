//! Append-only event store boundary.
//!
//! Stores and loads tenant-scoped event streams without making any storage
//! assumptions. Only the in-memory backend ships here.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
