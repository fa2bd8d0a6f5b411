use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use std::sync::Arc;

use comptoir_core::{AggregateId, ExpectedVersion, TenantId};
use comptoir_events::{EnvelopeHeader, Event, EventEnvelope};

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// Lifecycle of an order or request event:
///
/// 1. **Domain event**: produced by the aggregate's `handle()`
/// 2. **UncommittedEvent**: serialized payload plus stream metadata
/// 3. **StoredEvent**: persisted, with its `sequence_number`
/// 4. **EventEnvelope**: published on the bus for downstream consumers
///
/// Build it with `UncommittedEvent::from_typed()`, which serializes the payload to
/// JSON and copies `event_type`, `event_version` and `occurred_at` off the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers are assigned on append, start at 1, and increase by one
/// per event within a `(tenant_id, aggregate_id)` stream. The last sequence
/// number is the stream version used for optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Bus representation of this event.
    pub fn to_envelope(&self) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            EnvelopeHeader {
                event_id: self.event_id,
                tenant_id: self.tenant_id,
                aggregate_id: self.aggregate_id,
                aggregate_type: self.aggregate_type.clone(),
                sequence_number: self.sequence_number,
                event_type: self.event_type.clone(),
                occurred_at: self.occurred_at,
            },
            self.payload.clone(),
        )
    }
}

/// Event store operation error.
///
/// Infrastructure failures (storage, concurrency, isolation), as opposed to
/// `DomainError`s raised by the aggregates.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only, tenant-scoped event store.
///
/// One stream per order or request, keyed by `(tenant_id, aggregate_id)`.
///
/// `append()`:
/// - requires every event of the batch to target the same tenant, aggregate and aggregate type
/// - checks `expected_version` against the current stream version
/// - assigns sequence numbers starting at `current_version + 1`
/// - persists the batch atomically
///
/// `load_stream()` returns the events in sequence order, or an empty vector for
/// an entity that does not exist.
///
/// `delete_stream()` is the only non-append operation. It backs the
/// administrative hard delete of retail and Pro orders and removes the whole
/// stream; a later append to the same key starts again at version 1.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Remove a stream; returns how many events were dropped (0 if it did not exist).
    fn delete_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<usize, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(tenant_id, aggregate_id)
    }

    fn delete_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<usize, EventStoreError> {
        (**self).delete_stream(tenant_id, aggregate_id)
    }
}

impl UncommittedEvent {
    /// Build an uncommitted event from a typed domain event.
    pub fn from_typed<E>(
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
