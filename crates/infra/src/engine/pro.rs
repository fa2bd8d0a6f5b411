use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use comptoir_accounts::{Customer, CustomerId};
use comptoir_core::{AggregateId, AggregateRoot, ExpectedVersion, TenantId, UserId};
use comptoir_events::{EventBus, EventEnvelope, StatusNotice};
use comptoir_pro::{
    AssignInvoiceNumber, OrderOrigin, PlaceProOrder, ProOrder, ProOrderCommand, ProOrderId,
    ProOrderLineInput, ProOrderType,
};

use super::Engine;
use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStore;

/// Direct Pro order placement by (or on behalf of) a Pro customer.
#[derive(Debug, Clone)]
pub struct PlaceProOrderInput {
    pub tenant_id: TenantId,
    pub customer_id: UserId,
    pub order_type: ProOrderType,
    pub lines: Vec<ProOrderLineInput>,
    pub shipping_cost: u64,
    pub customer_notes: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Parameters of a new order whose id and origin are already decided.
pub(super) struct NewProOrder {
    pub order_id: ProOrderId,
    pub customer_id: UserId,
    pub order_type: ProOrderType,
    pub lines: Vec<ProOrderLineInput>,
    pub shipping_cost: u64,
    pub customer_notes: Option<String>,
    pub origin: OrderOrigin,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl<S, B, N> Engine<S, B, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    N: EventBus<StatusNotice>,
{
    /// Place a Pro order at the customer's negotiated discount.
    pub fn place_pro_order(&self, input: PlaceProOrderInput) -> Result<ProOrder, DispatchError> {
        self.open_pro_order(
            input.tenant_id,
            NewProOrder {
                order_id: ProOrderId::new(AggregateId::new()),
                customer_id: input.customer_id,
                order_type: input.order_type,
                lines: input.lines,
                shipping_cost: input.shipping_cost,
                customer_notes: input.customer_notes,
                origin: OrderOrigin::Direct,
                actor: input.actor,
                occurred_at: input.occurred_at,
            },
        )
    }

    /// Create the order stream; fails with `Conflict` if it already exists.
    pub(super) fn open_pro_order(
        &self,
        tenant_id: TenantId,
        order: NewProOrder,
    ) -> Result<ProOrder, DispatchError> {
        let customer = self.approved_pro(tenant_id, order.customer_id)?;
        let discount_rate = customer
            .pro_info()
            .map(|info| info.discount_rate)
            .unwrap_or_default();

        let order_number =
            self.next_number(tenant_id, &self.config.pro_order_prefix, order.occurred_at)?;
        let payment_due_date =
            order.occurred_at + Duration::days(i64::from(self.config.payment_terms_days));

        self.execute_expecting::<ProOrder>(
            ProOrderCommand::PlaceProOrder(PlaceProOrder {
                tenant_id,
                order_id: order.order_id,
                order_number,
                customer_id: order.customer_id,
                order_type: order.order_type,
                lines: order.lines,
                discount_rate,
                shipping_cost: order.shipping_cost,
                payment_due_date: Some(payment_due_date),
                customer_notes: order.customer_notes,
                origin: order.origin,
                placed_by: order.actor,
                occurred_at: order.occurred_at,
            }),
            ExpectedVersion::Exact(0),
        )
    }

    /// Assign an invoice number, or return the one already assigned.
    ///
    /// A number is only allocated when the order has none yet, so retries
    /// never burn sequence values.
    pub fn generate_invoice_number(
        &self,
        tenant_id: TenantId,
        order_id: ProOrderId,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Result<String, DispatchError> {
        let order: ProOrder = self.load(tenant_id, order_id.0)?;
        if let Some(existing) = order.invoice_number() {
            debug!(
                tenant_id = %tenant_id,
                order_id = %order_id,
                invoice_number = existing,
                "invoice number already assigned"
            );
            return Ok(existing.to_string());
        }

        let invoice_number =
            self.next_number(tenant_id, &self.config.invoice_prefix, occurred_at)?;
        let order = self.execute_expecting::<ProOrder>(
            ProOrderCommand::AssignInvoiceNumber(AssignInvoiceNumber {
                tenant_id,
                order_id,
                invoice_number,
                actor,
                occurred_at,
            }),
            ExpectedVersion::Exact(order.version()),
        )?;

        let assigned = order.invoice_number().unwrap_or_default().to_string();
        info!(
            tenant_id = %tenant_id,
            order_id = %order_id,
            invoice_number = %assigned,
            "invoice number assigned"
        );
        Ok(assigned)
    }

    /// Administrative hard delete; allowed in any status, paid or not.
    pub fn delete_pro_order(
        &self,
        tenant_id: TenantId,
        order_id: ProOrderId,
    ) -> Result<(), DispatchError> {
        self.delete::<ProOrder>(tenant_id, order_id.0)
    }

    /// Customer record of `user_id`, which must be an approved Pro.
    pub(super) fn approved_pro(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Customer, DispatchError> {
        let customer: Option<Customer> =
            self.load_optional(tenant_id, CustomerId::for_user(user_id).0)?;
        match customer {
            Some(customer) if customer.is_pro() => Ok(customer),
            _ => Err(DispatchError::Unauthorized),
        }
    }
}
