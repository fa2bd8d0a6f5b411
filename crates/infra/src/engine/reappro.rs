use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use comptoir_core::{AggregateId, ExpectedVersion, TenantId, UserId};
use comptoir_events::{EventBus, EventEnvelope, StatusNotice};
use comptoir_pro::ProOrder;
use comptoir_reappro::{
    CreateReapproRequest, DeliveryMethod, LinkGeneratedOrder, Priority, ReapproLineInput,
    ReapproRequest, ReapproRequestCommand, ReapproRequestId,
};

use super::Engine;
use super::pro::NewProOrder;
use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStore;

/// Replenishment request raised by a Pro customer.
#[derive(Debug, Clone)]
pub struct CreateReapproInput {
    pub tenant_id: TenantId,
    pub customer_id: UserId,
    pub lines: Vec<ReapproLineInput>,
    pub priority: Priority,
    pub requested_delivery_date: Option<DateTime<Utc>>,
    pub delivery_method: DeliveryMethod,
    pub delivery_address: Option<String>,
    pub customer_notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl<S, B, N> Engine<S, B, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    N: EventBus<StatusNotice>,
{
    /// Open a draft request numbered `REA-{year}-{seq}`.
    pub fn create_reappro_request(
        &self,
        input: CreateReapproInput,
    ) -> Result<ReapproRequest, DispatchError> {
        let customer = self.approved_pro(input.tenant_id, input.customer_id)?;
        let Some(pro_info) = customer.pro_info() else {
            return Err(DispatchError::InvariantViolation(
                "approved pro customer has no pro profile".to_string(),
            ));
        };

        let request_number =
            self.next_number(input.tenant_id, &self.config.reappro_prefix, input.occurred_at)?;

        self.execute_expecting::<ReapproRequest>(
            ReapproRequestCommand::Create(CreateReapproRequest {
                tenant_id: input.tenant_id,
                request_id: ReapproRequestId::new(AggregateId::new()),
                request_number,
                customer_id: input.customer_id,
                partnership_type: pro_info.partnership_type,
                lines: input.lines,
                priority: input.priority,
                requested_delivery_date: input.requested_delivery_date,
                delivery_method: input.delivery_method,
                delivery_address: input.delivery_address,
                customer_notes: input.customer_notes,
                occurred_at: input.occurred_at,
            }),
            ExpectedVersion::Exact(0),
        )
    }

    /// Turn an approved (or partially approved) request into a Pro order.
    ///
    /// Runs at most once per request. The order id is derived from the
    /// request id and its stream is created with expected version 0, so a
    /// retry after a crash between the two writes picks up the order that
    /// was already created. Once the request points at its order, further
    /// calls fail with `Conflict`.
    pub fn convert_reappro_to_order(
        &self,
        tenant_id: TenantId,
        request_id: ReapproRequestId,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Result<ProOrder, DispatchError> {
        let request: ReapproRequest = self.load(tenant_id, request_id.0)?;
        let plan = request.conversion_plan()?;

        let existing: Option<ProOrder> = self.load_optional(tenant_id, plan.order_id.0)?;
        let order = match existing {
            Some(order) => {
                warn!(
                    tenant_id = %tenant_id,
                    request_id = %request_id,
                    order_id = %plan.order_id,
                    "resuming interrupted reappro conversion"
                );
                order
            }
            None => self.open_pro_order(
                tenant_id,
                NewProOrder {
                    order_id: plan.order_id,
                    customer_id: plan.customer_id,
                    order_type: plan.order_type,
                    lines: plan.lines,
                    shipping_cost: self.config.reappro_shipping_cost,
                    customer_notes: plan.customer_notes,
                    origin: plan.origin,
                    actor,
                    occurred_at,
                },
            )?,
        };

        // The request aggregate refuses a second link with `Conflict`.
        self.execute::<ReapproRequest>(ReapproRequestCommand::LinkGeneratedOrder(
            LinkGeneratedOrder {
                tenant_id,
                request_id,
                order_id: plan.order_id.0,
                order_number: order.order_number().to_string(),
                actor,
                occurred_at,
            },
        ))?;

        info!(
            tenant_id = %tenant_id,
            request_id = %request_id,
            order_id = %plan.order_id,
            order_number = order.order_number(),
            "reappro request converted to pro order"
        );
        Ok(order)
    }
}
