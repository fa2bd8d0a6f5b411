//! Lifecycle engine: the operations an administrator or Pro customer invokes.
//!
//! Single-entity operations go straight through [`Engine::execute`]. The
//! workflows that need more than one stream, a document number or the
//! customer's commercial profile live in the submodules.

mod accounts;
mod pro;
mod reappro;
mod retail;
pub mod streams;

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use comptoir_core::{AggregateId, ExpectedVersion, TenantId};
use comptoir_events::{Event, EventBus, EventEnvelope, Notifiable, StatusNotice};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::EngineConfig;
use crate::event_store::EventStore;
use crate::numbering::DocumentNumberAllocator;

pub use accounts::SubmitProRequestInput;
pub use pro::PlaceProOrderInput;
pub use reappro::CreateReapproInput;
pub use streams::EventSourced;

/// Order & request lifecycle engine.
///
/// - `S`: event store
/// - `B`: bus receiving every committed event envelope
/// - `N`: bus receiving `StatusNotice`s for the notification collaborator
pub struct Engine<S, B, N> {
    dispatcher: CommandDispatcher<S, B>,
    notices: N,
    numbers: Arc<dyn DocumentNumberAllocator>,
    config: EngineConfig,
}

impl<S, B, N> Engine<S, B, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    N: EventBus<StatusNotice>,
{
    pub fn new(
        store: S,
        bus: B,
        notices: N,
        numbers: Arc<dyn DocumentNumberAllocator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            notices,
            numbers,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a command against the latest state of its entity.
    pub fn execute<A: EventSourced>(&self, command: A::Command) -> Result<A, DispatchError> {
        self.execute_expecting(command, ExpectedVersion::Any)
    }

    /// Run a command only if the entity is still at `expected`.
    ///
    /// Pass the version the caller read to get updatedAt-style protection
    /// against another administrator's concurrent edit.
    ///
    /// An `Err` means nothing was committed, except `Publish`, which is
    /// returned when the event envelope bus refuses an event that is already
    /// stored. Status notices are sent after the commit and only on a best
    /// effort basis. A failed notice is logged and the committed state is
    /// still returned.
    pub fn execute_expecting<A: EventSourced>(
        &self,
        command: A::Command,
        expected: ExpectedVersion,
    ) -> Result<A, DispatchError> {
        let (tenant_id, aggregate_id) = A::route(&command);

        let committed = self
            .dispatcher
            .dispatch(
                tenant_id,
                aggregate_id,
                A::AGGREGATE_TYPE,
                expected,
                command,
                |_, id| A::empty_stream(id),
            )
            .inspect_err(|err| {
                if let DispatchError::Conflict(msg) = err {
                    warn!(
                        tenant_id = %tenant_id,
                        aggregate_type = A::AGGREGATE_TYPE,
                        aggregate_id = %aggregate_id,
                        "command rejected with conflict: {msg}"
                    );
                }
            })?;

        if committed.events.is_empty() {
            debug!(
                tenant_id = %tenant_id,
                aggregate_type = A::AGGREGATE_TYPE,
                aggregate_id = %aggregate_id,
                "command accepted as a no-op"
            );
        } else {
            info!(
                tenant_id = %tenant_id,
                aggregate_type = A::AGGREGATE_TYPE,
                aggregate_id = %aggregate_id,
                events = ?committed.events.iter().map(|e| e.event_type()).collect::<Vec<_>>(),
                "command committed"
            );
        }

        self.publish_notices::<A>(tenant_id, aggregate_id, &committed.events);
        Ok(committed.aggregate)
    }

    /// Current state of an entity; `NotFound` if it does not exist.
    pub fn load<A: EventSourced>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<A, DispatchError> {
        self.dispatcher
            .load(tenant_id, aggregate_id, |_, id| A::empty_stream(id))
    }

    fn load_optional<A: EventSourced>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Option<A>, DispatchError> {
        self.dispatcher
            .load_optional(tenant_id, aggregate_id, |_, id| A::empty_stream(id))
    }

    /// Hard delete, after checking the stream holds an `A`.
    fn delete<A: EventSourced>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<(), DispatchError> {
        let _: A = self.load(tenant_id, aggregate_id)?;
        let removed = self.dispatcher.delete(tenant_id, aggregate_id)?;
        info!(
            tenant_id = %tenant_id,
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate_id,
            removed,
            "stream deleted"
        );
        Ok(())
    }

    fn next_number(
        &self,
        tenant_id: TenantId,
        prefix: &str,
        at: DateTime<Utc>,
    ) -> Result<String, DispatchError> {
        Ok(self.numbers.next_number(tenant_id, prefix, at.year())?)
    }

    fn publish_notices<A: EventSourced>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        events: &[A::Event],
    ) {
        for event in events {
            let Some(draft) = event.notice() else {
                continue;
            };
            let notice =
                draft.into_notice(tenant_id, A::AGGREGATE_TYPE, aggregate_id, event.occurred_at());
            if let Err(err) = self.notices.publish(notice) {
                warn!(
                    tenant_id = %tenant_id,
                    aggregate_type = A::AGGREGATE_TYPE,
                    aggregate_id = %aggregate_id,
                    error = ?err,
                    "status notice dropped after commit"
                );
            }
        }
    }
}
