use serde_json::Value as JsonValue;

use comptoir_core::TenantId;
use comptoir_events::{EventBus, EventEnvelope, StatusNotice};
use comptoir_retail::{RetailOrder, RetailOrderId};

use super::Engine;
use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStore;

impl<S, B, N> Engine<S, B, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    N: EventBus<StatusNotice>,
{
    /// Administrative hard delete; allowed in any status, paid or not.
    pub fn delete_retail_order(
        &self,
        tenant_id: TenantId,
        order_id: RetailOrderId,
    ) -> Result<(), DispatchError> {
        self.delete::<RetailOrder>(tenant_id, order_id.0)
    }
}
