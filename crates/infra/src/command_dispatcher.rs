//! Command execution pipeline (application-level orchestration).
//!
//! Every operation on an order or request goes through the same steps:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (tenant-scoped)
//!   ↓
//! 2. Check the caller's expected version against the stream
//!   ↓
//! 3. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 4. Handle command (pure decision logic, produces events)
//!   ↓
//! 5. Persist events (append-only, `Exact(loaded_version)`)
//!   ↓
//! 6. Publish envelopes to the bus
//! ```
//!
//! Step 5 is what serializes concurrent administrators: two writers that
//! loaded the same version cannot both append, the second one gets
//! `DispatchError::Conflict` and must re-read before retrying.
//!
//! This module contains no IO itself; it composes infrastructure traits.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use comptoir_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, TenantId};
use comptoir_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
use crate::numbering::NumberingError;

/// Caller-facing error for every engine operation.
///
/// Mirrors the `DomainError` categories and adds the infrastructure ones.
/// All variants are recoverable: surface the message, re-read, retry.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Stale version, concurrent writer, or a second conversion.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    /// Cross-tenant or cross-aggregate data in a loaded stream.
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// Historical payloads could not be decoded into the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),

    #[error(transparent)]
    Numbering(#[from] NumberingError),

    /// Publication failed after a successful append; the state change is durable.
    #[error("publication failed after commit: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Conflict(msg),
            EventStoreError::TenantIsolation(msg) => DispatchError::TenantIsolation(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvalidTransition(msg) => DispatchError::InvalidTransition(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Outcome of a successful dispatch.
#[derive(Debug)]
pub struct Committed<A: Aggregate> {
    /// State after the new events were applied.
    pub aggregate: A,
    /// Decided events, in order. Empty for accepted no-ops.
    pub events: Vec<A::Event>,
    pub stored: Vec<StoredEvent>,
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Events are persisted before they are published, so a failed publish never
/// loses a committed change (at-least-once delivery, consumers de-duplicate by
/// `event_id`).
///
/// - `S`: event store implementation
/// - `B`: bus receiving one `EventEnvelope` per committed event
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command through the full event-sourcing pipeline.
    ///
    /// `expected` is the caller's view of the entity: `Any` to act on the
    /// latest state, `Exact(n)` to fail with `Conflict` unless the stream is
    /// still at version `n` (`Exact(0)`: the entity must not exist yet).
    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        expected: ExpectedVersion,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Committed<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: comptoir_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history (tenant-scoped)
        let history = self.store.load_stream(tenant_id, aggregate_id)?;
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;
        let loaded_version = stream_version(&history);

        // 2) Caller expectation
        expected.check(loaded_version)?;

        // 3) Rehydrate aggregate
        let mut aggregate = make_aggregate(tenant_id, aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 4) Decide events (no mutation)
        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(Committed {
                aggregate,
                events: vec![],
                stored: vec![],
            });
        }

        // 5) Persist (append-only, optimistic)
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    tenant_id,
                    aggregate_id,
                    aggregate_type,
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stored = self
            .store
            .append(uncommitted, ExpectedVersion::Exact(loaded_version))?;

        for ev in &decided {
            aggregate.apply(ev);
        }
        debug_assert_eq!(aggregate.version(), loaded_version + decided.len() as u64);

        // 6) Publish committed events (after append)
        for e in &stored {
            self.bus
                .publish(e.to_envelope())
                .map_err(|err| DispatchError::Publish(format!("{err:?}")))?;
        }

        Ok(Committed {
            aggregate,
            events: decided,
            stored,
        })
    }

    /// Rehydrate an aggregate; `None` when its stream is empty.
    pub fn load_optional<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Option<A>, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(tenant_id, aggregate_id)?;
        if history.is_empty() {
            return Ok(None);
        }
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;

        let mut aggregate = make_aggregate(tenant_id, aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;
        Ok(Some(aggregate))
    }

    /// Rehydrate an aggregate; `NotFound` when its stream is empty.
    pub fn load<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        self.load_optional(tenant_id, aggregate_id, make_aggregate)?
            .ok_or(DispatchError::NotFound)
    }

    /// Hard-delete a stream. `NotFound` when there was nothing to delete.
    pub fn delete(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> Result<usize, DispatchError> {
        match self.store.delete_stream(tenant_id, aggregate_id)? {
            0 => Err(DispatchError::NotFound),
            removed => Ok(removed),
        }
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Enforce tenant isolation even if a buggy backend returns cross-tenant data.
    // Also ensure the stream is monotonically increasing by sequence number.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.tenant_id != tenant_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong tenant_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}
