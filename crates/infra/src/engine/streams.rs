//! Binding between domain aggregates and their event streams.

use serde::Serialize;
use serde::de::DeserializeOwned;

use comptoir_accounts::{
    Customer, CustomerCommand, CustomerId, ProRequest, ProRequestCommand, ProRequestId,
};
use comptoir_core::{Aggregate, AggregateId, DomainError, TenantId};
use comptoir_events::{Event, Notifiable};
use comptoir_pro::{ProOrder, ProOrderCommand, ProOrderId};
use comptoir_reappro::{ReapproRequest, ReapproRequestCommand, ReapproRequestId};
use comptoir_retail::{RetailOrder, RetailOrderCommand, RetailOrderId};

/// An aggregate the engine can persist, rehydrate and notify about.
pub trait EventSourced:
    Aggregate<
        Error = DomainError,
        Event: Event + Notifiable + Serialize + DeserializeOwned,
    > + Sized
{
    /// Stream type tag, also used as `entity_type` in status notices.
    const AGGREGATE_TYPE: &'static str;

    fn empty_stream(id: AggregateId) -> Self;

    /// Stream a command is addressed to.
    fn route(command: &Self::Command) -> (TenantId, AggregateId);
}

impl EventSourced for RetailOrder {
    const AGGREGATE_TYPE: &'static str = "retail.order";

    fn empty_stream(id: AggregateId) -> Self {
        RetailOrder::empty(RetailOrderId::new(id))
    }

    fn route(command: &Self::Command) -> (TenantId, AggregateId) {
        let (tenant_id, order_id) = match command {
            RetailOrderCommand::PlaceRetailOrder(c) => (c.tenant_id, c.order_id),
            RetailOrderCommand::SetStatus(c) => (c.tenant_id, c.order_id),
            RetailOrderCommand::MarkReadyForPickup(c) => (c.tenant_id, c.order_id),
            RetailOrderCommand::MarkPaid(c) => (c.tenant_id, c.order_id),
            RetailOrderCommand::MarkCollectedAndPaid(c) => (c.tenant_id, c.order_id),
        };
        (tenant_id, order_id.0)
    }
}

impl EventSourced for ProOrder {
    const AGGREGATE_TYPE: &'static str = "pro.order";

    fn empty_stream(id: AggregateId) -> Self {
        ProOrder::empty(ProOrderId::new(id))
    }

    fn route(command: &Self::Command) -> (TenantId, AggregateId) {
        let (tenant_id, order_id) = match command {
            ProOrderCommand::PlaceProOrder(c) => (c.tenant_id, c.order_id),
            ProOrderCommand::UpdateStatus(c) => (c.tenant_id, c.order_id),
            ProOrderCommand::RecordPayment(c) => (c.tenant_id, c.order_id),
            ProOrderCommand::AssignInvoiceNumber(c) => (c.tenant_id, c.order_id),
            ProOrderCommand::AddInternalNotes(c) => (c.tenant_id, c.order_id),
            ProOrderCommand::Cancel(c) => (c.tenant_id, c.order_id),
        };
        (tenant_id, order_id.0)
    }
}

impl EventSourced for Customer {
    const AGGREGATE_TYPE: &'static str = "accounts.customer";

    fn empty_stream(id: AggregateId) -> Self {
        Customer::empty(CustomerId::new(id))
    }

    fn route(command: &Self::Command) -> (TenantId, AggregateId) {
        let (tenant_id, customer_id) = match command {
            CustomerCommand::Register(c) => (c.tenant_id, c.customer_id),
            CustomerCommand::GrantPro(c) => (c.tenant_id, c.customer_id),
            CustomerCommand::UpdateProProfile(c) => (c.tenant_id, c.customer_id),
            CustomerCommand::SuspendPro(c) => (c.tenant_id, c.customer_id),
            CustomerCommand::ReinstatePro(c) => (c.tenant_id, c.customer_id),
        };
        (tenant_id, customer_id.0)
    }
}

impl EventSourced for ProRequest {
    const AGGREGATE_TYPE: &'static str = "accounts.pro_request";

    fn empty_stream(id: AggregateId) -> Self {
        ProRequest::empty(ProRequestId::new(id))
    }

    fn route(command: &Self::Command) -> (TenantId, AggregateId) {
        let (tenant_id, request_id) = match command {
            ProRequestCommand::Submit(c) => (c.tenant_id, c.request_id),
            ProRequestCommand::Approve(c) => (c.tenant_id, c.request_id),
            ProRequestCommand::Reject(c) => (c.tenant_id, c.request_id),
            ProRequestCommand::Cancel(c) => (c.tenant_id, c.request_id),
        };
        (tenant_id, request_id.0)
    }
}

impl EventSourced for ReapproRequest {
    const AGGREGATE_TYPE: &'static str = "reappro.request";

    fn empty_stream(id: AggregateId) -> Self {
        ReapproRequest::empty(ReapproRequestId::new(id))
    }

    fn route(command: &Self::Command) -> (TenantId, AggregateId) {
        let (tenant_id, request_id) = match command {
            ReapproRequestCommand::Create(c) => (c.tenant_id, c.request_id),
            ReapproRequestCommand::Submit(c) => (c.tenant_id, c.request_id),
            ReapproRequestCommand::Approve(c) => (c.tenant_id, c.request_id),
            ReapproRequestCommand::Reject(c) => (c.tenant_id, c.request_id),
            ReapproRequestCommand::LinkGeneratedOrder(c) => (c.tenant_id, c.request_id),
            ReapproRequestCommand::UpdateStatus(c) => (c.tenant_id, c.request_id),
            ReapproRequestCommand::AddInternalNotes(c) => (c.tenant_id, c.request_id),
            ReapproRequestCommand::Cancel(c) => (c.tenant_id, c.request_id),
        };
        (tenant_id, request_id.0)
    }
}
