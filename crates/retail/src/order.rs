use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ProductId, TenantId, UserId};
use comptoir_events::{Event, NoticeDraft, Notifiable};

/// Retail order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetailOrderId(pub AggregateId);

impl RetailOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RetailOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Click-and-collect lifecycle.
///
/// `pending → confirmed → preparing → ready_for_pickup → collected`, with
/// `cancelled` reachable from any non-terminal state. Admins may override the
/// status freely; the order of variants is only the nominal flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetailOrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    Collected,
    Cancelled,
}

impl RetailOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RetailOrderStatus::Pending => "pending",
            RetailOrderStatus::Confirmed => "confirmed",
            RetailOrderStatus::Preparing => "preparing",
            RetailOrderStatus::ReadyForPickup => "ready_for_pickup",
            RetailOrderStatus::Collected => "collected",
            RetailOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RetailOrderStatus::Collected | RetailOrderStatus::Cancelled)
    }

    /// Statuses that come before the order is physically ready.
    fn precedes_pickup(self) -> bool {
        matches!(
            self,
            RetailOrderStatus::Pending | RetailOrderStatus::Confirmed | RetailOrderStatus::Preparing
        )
    }
}

/// Ordered item with name and price snapshots taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetailItem {
    pub product_id: ProductId,
    pub name: String,
    /// Price in smallest currency unit.
    pub unit_price: u64,
    pub quantity: u32,
    pub variant: Option<String>,
}

impl RetailItem {
    pub fn line_total(&self) -> Option<u64> {
        self.unit_price.checked_mul(self.quantity as u64)
    }
}

/// Where the customer collects and pays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupPoint {
    pub name: String,
    pub address: String,
}

/// Aggregate root: RetailOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetailOrder {
    id: RetailOrderId,
    tenant_id: Option<TenantId>,
    customer_id: Option<UserId>,
    status: RetailOrderStatus,
    items: Vec<RetailItem>,
    pickup: Option<PickupPoint>,
    items_price: u64,
    tax_price: u64,
    shipping_price: u64,
    total_price: u64,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    placed_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl RetailOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RetailOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            customer_id: None,
            status: RetailOrderStatus::Pending,
            items: Vec::new(),
            pickup: None,
            items_price: 0,
            tax_price: 0,
            shipping_price: 0,
            total_price: 0,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            notes: None,
            placed_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RetailOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn customer_id(&self) -> Option<UserId> {
        self.customer_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn status(&self) -> RetailOrderStatus {
        self.status
    }

    pub fn items(&self) -> &[RetailItem] {
        &self.items
    }

    pub fn pickup(&self) -> Option<&PickupPoint> {
        self.pickup.as_ref()
    }

    pub fn items_price(&self) -> u64 {
        self.items_price
    }

    pub fn tax_price(&self) -> u64 {
        self.tax_price
    }

    pub fn shipping_price(&self) -> u64 {
        self.shipping_price
    }

    pub fn total_price(&self) -> u64 {
        self.total_price
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    /// Generic "delivered" flag: raised when the order is ready for pickup.
    pub fn is_delivered(&self) -> bool {
        self.is_delivered
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }
}

impl AggregateRoot for RetailOrder {
    type Id = RetailOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceRetailOrder (checkout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRetailOrder {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub customer_id: UserId,
    pub items: Vec<RetailItem>,
    pub pickup: PickupPoint,
    /// Tax computed by checkout, in smallest currency unit.
    pub tax_price: u64,
    pub shipping_price: u64,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetRetailStatus (admin override, any status to any status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRetailStatus {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub status: RetailOrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkReadyForPickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReadyForPickup {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPaid {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkCollectedAndPaid (customer pays on pickup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkCollectedAndPaid {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetailOrderCommand {
    PlaceRetailOrder(PlaceRetailOrder),
    SetStatus(SetRetailStatus),
    MarkReadyForPickup(MarkReadyForPickup),
    MarkPaid(MarkPaid),
    MarkCollectedAndPaid(MarkCollectedAndPaid),
}

/// Event: RetailOrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetailOrderPlaced {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub customer_id: UserId,
    pub items: Vec<RetailItem>,
    pub pickup: PickupPoint,
    pub items_price: u64,
    pub tax_price: u64,
    pub shipping_price: u64,
    pub total_price: u64,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RetailStatusSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetailStatusSet {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub from: RetailOrderStatus,
    pub to: RetailOrderStatus,
    /// Whether this change also raised the delivered flag.
    pub marks_delivered: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderReadyForPickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReadyForPickup {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    /// Whether the status moved to `ready_for_pickup` as well.
    pub advances_status: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaid {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCollectedAndPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCollectedAndPaid {
    pub tenant_id: TenantId,
    pub order_id: RetailOrderId,
    pub marks_delivered: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetailOrderEvent {
    RetailOrderPlaced(RetailOrderPlaced),
    RetailStatusSet(RetailStatusSet),
    OrderReadyForPickup(OrderReadyForPickup),
    OrderPaid(OrderPaid),
    OrderCollectedAndPaid(OrderCollectedAndPaid),
}

impl Event for RetailOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetailOrderEvent::RetailOrderPlaced(_) => "retail.order.placed",
            RetailOrderEvent::RetailStatusSet(_) => "retail.order.status_set",
            RetailOrderEvent::OrderReadyForPickup(_) => "retail.order.ready_for_pickup",
            RetailOrderEvent::OrderPaid(_) => "retail.order.paid",
            RetailOrderEvent::OrderCollectedAndPaid(_) => "retail.order.collected_and_paid",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RetailOrderEvent::RetailOrderPlaced(e) => e.occurred_at,
            RetailOrderEvent::RetailStatusSet(e) => e.occurred_at,
            RetailOrderEvent::OrderReadyForPickup(e) => e.occurred_at,
            RetailOrderEvent::OrderPaid(e) => e.occurred_at,
            RetailOrderEvent::OrderCollectedAndPaid(e) => e.occurred_at,
        }
    }
}

impl Notifiable for RetailOrderEvent {
    fn notice(&self) -> Option<NoticeDraft> {
        match self {
            RetailOrderEvent::RetailOrderPlaced(_) => {
                Some(NoticeDraft::new(RetailOrderStatus::Pending.as_str(), None))
            }
            RetailOrderEvent::RetailStatusSet(e) => Some(NoticeDraft::new(e.to.as_str(), None)),
            RetailOrderEvent::OrderReadyForPickup(_) => Some(NoticeDraft::new(
                RetailOrderStatus::ReadyForPickup.as_str(),
                None,
            )),
            RetailOrderEvent::OrderCollectedAndPaid(_) => {
                Some(NoticeDraft::new(RetailOrderStatus::Collected.as_str(), None))
            }
            RetailOrderEvent::OrderPaid(_) => None,
        }
    }
}

impl Aggregate for RetailOrder {
    type Command = RetailOrderCommand;
    type Event = RetailOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RetailOrderEvent::RetailOrderPlaced(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.customer_id = Some(e.customer_id);
                self.status = RetailOrderStatus::Pending;
                self.items = e.items.clone();
                self.pickup = Some(e.pickup.clone());
                self.items_price = e.items_price;
                self.tax_price = e.tax_price;
                self.shipping_price = e.shipping_price;
                self.total_price = e.total_price;
                self.notes = e.notes.clone();
                self.placed_at = Some(e.occurred_at);
                self.created = true;
            }
            RetailOrderEvent::RetailStatusSet(e) => {
                self.status = e.to;
                if e.marks_delivered {
                    self.is_delivered = true;
                    self.delivered_at = Some(e.occurred_at);
                }
            }
            RetailOrderEvent::OrderReadyForPickup(e) => {
                self.is_delivered = true;
                self.delivered_at = Some(e.occurred_at);
                if e.advances_status {
                    self.status = RetailOrderStatus::ReadyForPickup;
                }
            }
            RetailOrderEvent::OrderPaid(e) => {
                self.is_paid = true;
                self.paid_at = Some(e.occurred_at);
            }
            RetailOrderEvent::OrderCollectedAndPaid(e) => {
                self.status = RetailOrderStatus::Collected;
                self.is_paid = true;
                self.paid_at = Some(e.occurred_at);
                if e.marks_delivered {
                    self.is_delivered = true;
                    self.delivered_at = Some(e.occurred_at);
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RetailOrderCommand::PlaceRetailOrder(cmd) => self.handle_place(cmd),
            RetailOrderCommand::SetStatus(cmd) => self.handle_set_status(cmd),
            RetailOrderCommand::MarkReadyForPickup(cmd) => self.handle_ready_for_pickup(cmd),
            RetailOrderCommand::MarkPaid(cmd) => self.handle_mark_paid(cmd),
            RetailOrderCommand::MarkCollectedAndPaid(cmd) => self.handle_collected_and_paid(cmd),
        }
    }
}

impl RetailOrder {
    fn ensure_exists(&self, tenant_id: TenantId, order_id: RetailOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceRetailOrder) -> Result<Vec<RetailOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("retail order already exists"));
        }

        if cmd.items.is_empty() {
            return Err(DomainError::validation("cannot place order without items"));
        }

        let mut items_price: u64 = 0;
        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(DomainError::validation("item quantity must be positive"));
            }
            let line_total = item
                .line_total()
                .ok_or_else(|| DomainError::invariant("item amount overflow"))?;
            items_price = items_price
                .checked_add(line_total)
                .ok_or_else(|| DomainError::invariant("items price overflow"))?;
        }

        let total_price = items_price
            .checked_add(cmd.tax_price)
            .and_then(|t| t.checked_add(cmd.shipping_price))
            .ok_or_else(|| DomainError::invariant("total price overflow"))?;

        Ok(vec![RetailOrderEvent::RetailOrderPlaced(RetailOrderPlaced {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            customer_id: cmd.customer_id,
            items: cmd.items.clone(),
            pickup: cmd.pickup.clone(),
            items_price,
            tax_price: cmd.tax_price,
            shipping_price: cmd.shipping_price,
            total_price,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_status(&self, cmd: &SetRetailStatus) -> Result<Vec<RetailOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        // Re-setting the current status (notably `collected`) has no side effects.
        if self.status == cmd.status {
            return Ok(vec![]);
        }

        // Both pickup states stand for the generic delivered flag.
        let marks_delivered = matches!(
            cmd.status,
            RetailOrderStatus::ReadyForPickup | RetailOrderStatus::Collected
        ) && !self.is_delivered;

        Ok(vec![RetailOrderEvent::RetailStatusSet(RetailStatusSet {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.status,
            marks_delivered,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_ready_for_pickup(
        &self,
        cmd: &MarkReadyForPickup,
    ) -> Result<Vec<RetailOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if self.is_delivered {
            return Ok(vec![]);
        }

        Ok(vec![RetailOrderEvent::OrderReadyForPickup(OrderReadyForPickup {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            advances_status: self.status.precedes_pickup(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_paid(&self, cmd: &MarkPaid) -> Result<Vec<RetailOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if self.is_paid {
            return Err(DomainError::invalid_transition("order is already paid"));
        }

        Ok(vec![RetailOrderEvent::OrderPaid(OrderPaid {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_collected_and_paid(
        &self,
        cmd: &MarkCollectedAndPaid,
    ) -> Result<Vec<RetailOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if self.is_paid {
            return Err(DomainError::invalid_transition("order is already paid"));
        }

        Ok(vec![RetailOrderEvent::OrderCollectedAndPaid(OrderCollectedAndPaid {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            marks_delivered: !self.is_delivered,
            occurred_at: cmd.occurred_at,
        })])
    }
}
