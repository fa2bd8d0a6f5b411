use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{
    Aggregate, AggregateId, AggregateRoot, DiscountRate, DomainError, HistoryEntry, ProductId,
    TenantId, UserId, require_text,
};
use comptoir_events::{Event, NoticeDraft, Notifiable};

use crate::payment::PaymentStatus;

/// Pro order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProOrderId(pub AggregateId);

impl ProOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Commercial arrangement of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProOrderType {
    Reseller,
    Consignment,
}

/// Pro order lifecycle.
///
/// `draft → pending → confirmed → processing → ready → shipped → delivered →
/// completed`, `cancelled` from anything but `completed`. The admin status
/// override is unconditional; only `cancel` checks its source state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProOrderStatus {
    Draft,
    Pending,
    Confirmed,
    Processing,
    Ready,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
}

impl ProOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProOrderStatus::Draft => "draft",
            ProOrderStatus::Pending => "pending",
            ProOrderStatus::Confirmed => "confirmed",
            ProOrderStatus::Processing => "processing",
            ProOrderStatus::Ready => "ready",
            ProOrderStatus::Shipped => "shipped",
            ProOrderStatus::Delivered => "delivered",
            ProOrderStatus::Completed => "completed",
            ProOrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Where the order came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderOrigin {
    /// Placed directly by the customer or an admin.
    Direct,
    /// Generated from an approved replenishment request.
    Reappro {
        request_id: AggregateId,
        request_number: String,
    },
}

/// Line as submitted at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProOrderLineInput {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    /// Pro unit price in smallest currency unit.
    pub unit_price: u64,
}

/// Stored line, with its computed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProOrderLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
}

const ACTION_CREATED: &str = "created";
const ACTION_STATUS_CHANGE: &str = "status_change";
const ACTION_PAYMENT: &str = "payment";
const ACTION_INVOICE: &str = "invoice_number";
const ACTION_INTERNAL_NOTES: &str = "internal_notes";
const ACTION_CANCELLED: &str = "cancelled";

/// Aggregate root: ProOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProOrder {
    id: ProOrderId,
    tenant_id: Option<TenantId>,
    order_number: String,
    customer_id: Option<UserId>,
    order_type: ProOrderType,
    lines: Vec<ProOrderLine>,
    subtotal: u64,
    discount_rate: DiscountRate,
    discount_amount: u64,
    shipping_cost: u64,
    total_amount: u64,
    paid_amount: u64,
    payment_due_date: Option<DateTime<Utc>>,
    status: ProOrderStatus,
    invoice_number: Option<String>,
    customer_notes: Option<String>,
    internal_notes: Option<String>,
    origin: OrderOrigin,
    history: Vec<HistoryEntry>,
    version: u64,
    created: bool,
}

impl ProOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            order_number: String::new(),
            customer_id: None,
            order_type: ProOrderType::Reseller,
            lines: Vec::new(),
            subtotal: 0,
            discount_rate: DiscountRate::zero(),
            discount_amount: 0,
            shipping_cost: 0,
            total_amount: 0,
            paid_amount: 0,
            payment_due_date: None,
            status: ProOrderStatus::Draft,
            invoice_number: None,
            customer_notes: None,
            internal_notes: None,
            origin: OrderOrigin::Direct,
            history: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer_id(&self) -> Option<UserId> {
        self.customer_id
    }

    pub fn order_type(&self) -> ProOrderType {
        self.order_type
    }

    pub fn lines(&self) -> &[ProOrderLine] {
        &self.lines
    }

    pub fn subtotal(&self) -> u64 {
        self.subtotal
    }

    pub fn discount_rate(&self) -> DiscountRate {
        self.discount_rate
    }

    pub fn discount_amount(&self) -> u64 {
        self.discount_amount
    }

    pub fn shipping_cost(&self) -> u64 {
        self.shipping_cost
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn paid_amount(&self) -> u64 {
        self.paid_amount
    }

    pub fn outstanding_amount(&self) -> u64 {
        self.total_amount.saturating_sub(self.paid_amount)
    }

    pub fn payment_due_date(&self) -> Option<DateTime<Utc>> {
        self.payment_due_date
    }

    /// Payment standing as seen at `as_of`.
    pub fn payment_status(&self, as_of: DateTime<Utc>) -> PaymentStatus {
        PaymentStatus::derive(
            self.paid_amount,
            self.total_amount,
            self.payment_due_date,
            as_of,
        )
    }

    pub fn status(&self) -> ProOrderStatus {
        self.status
    }

    pub fn invoice_number(&self) -> Option<&str> {
        self.invoice_number.as_deref()
    }

    pub fn customer_notes(&self) -> Option<&str> {
        self.customer_notes.as_deref()
    }

    pub fn internal_notes(&self) -> Option<&str> {
        self.internal_notes.as_deref()
    }

    pub fn origin(&self) -> &OrderOrigin {
        &self.origin
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

impl AggregateRoot for ProOrder {
    type Id = ProOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceProOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceProOrder {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub order_number: String,
    pub customer_id: UserId,
    pub order_type: ProOrderType,
    pub lines: Vec<ProOrderLineInput>,
    /// Discount from the customer's pro profile at order time.
    pub discount_rate: DiscountRate,
    pub shipping_cost: u64,
    pub payment_due_date: Option<DateTime<Utc>>,
    pub customer_notes: Option<String>,
    pub origin: OrderOrigin,
    pub placed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProOrderStatus (unconditional admin transition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProOrderStatus {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub status: ProOrderStatus,
    pub note: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    /// Payment amount in smallest currency unit.
    pub amount: u64,
    pub note: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignInvoiceNumber.
///
/// The number itself is allocated by infrastructure; the aggregate only
/// guarantees it is stamped once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignInvoiceNumber {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub invoice_number: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddInternalNotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddInternalNotes {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub notes: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelProOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelProOrder {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub reason: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProOrderCommand {
    PlaceProOrder(PlaceProOrder),
    UpdateStatus(UpdateProOrderStatus),
    RecordPayment(RecordPayment),
    AssignInvoiceNumber(AssignInvoiceNumber),
    AddInternalNotes(AddInternalNotes),
    Cancel(CancelProOrder),
}

/// Event: ProOrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProOrderPlaced {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub order_number: String,
    pub customer_id: UserId,
    pub order_type: ProOrderType,
    pub lines: Vec<ProOrderLine>,
    pub subtotal: u64,
    pub discount_rate: DiscountRate,
    pub discount_amount: u64,
    pub shipping_cost: u64,
    pub total_amount: u64,
    pub payment_due_date: Option<DateTime<Utc>>,
    pub customer_notes: Option<String>,
    pub origin: OrderOrigin,
    pub placed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProOrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProOrderStatusChanged {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub from: ProOrderStatus,
    pub to: ProOrderStatus,
    pub note: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub amount: u64,
    pub new_paid_amount: u64,
    pub note: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceNumberAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNumberAssigned {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub invoice_number: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InternalNotesAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalNotesAdded {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub notes: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProOrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProOrderCancelled {
    pub tenant_id: TenantId,
    pub order_id: ProOrderId,
    pub from: ProOrderStatus,
    pub reason: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProOrderEvent {
    ProOrderPlaced(ProOrderPlaced),
    ProOrderStatusChanged(ProOrderStatusChanged),
    PaymentRecorded(PaymentRecorded),
    InvoiceNumberAssigned(InvoiceNumberAssigned),
    InternalNotesAdded(InternalNotesAdded),
    ProOrderCancelled(ProOrderCancelled),
}

impl Event for ProOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProOrderEvent::ProOrderPlaced(_) => "pro.order.placed",
            ProOrderEvent::ProOrderStatusChanged(_) => "pro.order.status_changed",
            ProOrderEvent::PaymentRecorded(_) => "pro.order.payment_recorded",
            ProOrderEvent::InvoiceNumberAssigned(_) => "pro.order.invoice_number_assigned",
            ProOrderEvent::InternalNotesAdded(_) => "pro.order.internal_notes_added",
            ProOrderEvent::ProOrderCancelled(_) => "pro.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProOrderEvent::ProOrderPlaced(e) => e.occurred_at,
            ProOrderEvent::ProOrderStatusChanged(e) => e.occurred_at,
            ProOrderEvent::PaymentRecorded(e) => e.occurred_at,
            ProOrderEvent::InvoiceNumberAssigned(e) => e.occurred_at,
            ProOrderEvent::InternalNotesAdded(e) => e.occurred_at,
            ProOrderEvent::ProOrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Notifiable for ProOrderEvent {
    fn notice(&self) -> Option<NoticeDraft> {
        match self {
            ProOrderEvent::ProOrderPlaced(_) => {
                Some(NoticeDraft::new(ProOrderStatus::Draft.as_str(), None))
            }
            ProOrderEvent::ProOrderStatusChanged(e) => {
                Some(NoticeDraft::new(e.to.as_str(), e.note.clone()))
            }
            ProOrderEvent::ProOrderCancelled(e) => Some(NoticeDraft::new(
                ProOrderStatus::Cancelled.as_str(),
                e.reason.clone(),
            )),
            ProOrderEvent::PaymentRecorded(_)
            | ProOrderEvent::InvoiceNumberAssigned(_)
            | ProOrderEvent::InternalNotesAdded(_) => None,
        }
    }
}

impl Aggregate for ProOrder {
    type Command = ProOrderCommand;
    type Event = ProOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProOrderEvent::ProOrderPlaced(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.order_number = e.order_number.clone();
                self.customer_id = Some(e.customer_id);
                self.order_type = e.order_type;
                self.lines = e.lines.clone();
                self.subtotal = e.subtotal;
                self.discount_rate = e.discount_rate;
                self.discount_amount = e.discount_amount;
                self.shipping_cost = e.shipping_cost;
                self.total_amount = e.total_amount;
                self.paid_amount = 0;
                self.payment_due_date = e.payment_due_date;
                self.status = ProOrderStatus::Draft;
                self.customer_notes = e.customer_notes.clone();
                self.origin = e.origin.clone();
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_CREATED,
                    None,
                    Some(e.placed_by),
                ));
                self.created = true;
            }
            ProOrderEvent::ProOrderStatusChanged(e) => {
                self.status = e.to;
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_STATUS_CHANGE,
                    e.note.clone(),
                    Some(e.actor),
                ));
            }
            ProOrderEvent::PaymentRecorded(e) => {
                self.paid_amount = e.new_paid_amount;
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_PAYMENT,
                    Some(payment_note(e.amount, e.note.as_deref())),
                    Some(e.actor),
                ));
            }
            ProOrderEvent::InvoiceNumberAssigned(e) => {
                self.invoice_number = Some(e.invoice_number.clone());
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_INVOICE,
                    Some(e.invoice_number.clone()),
                    Some(e.actor),
                ));
            }
            ProOrderEvent::InternalNotesAdded(e) => {
                self.internal_notes = Some(e.notes.clone());
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_INTERNAL_NOTES,
                    None,
                    Some(e.actor),
                ));
            }
            ProOrderEvent::ProOrderCancelled(e) => {
                self.status = ProOrderStatus::Cancelled;
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_CANCELLED,
                    e.reason.clone(),
                    Some(e.actor),
                ));
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProOrderCommand::PlaceProOrder(cmd) => self.handle_place(cmd),
            ProOrderCommand::UpdateStatus(cmd) => self.handle_update_status(cmd),
            ProOrderCommand::RecordPayment(cmd) => self.handle_record_payment(cmd),
            ProOrderCommand::AssignInvoiceNumber(cmd) => self.handle_assign_invoice_number(cmd),
            ProOrderCommand::AddInternalNotes(cmd) => self.handle_add_internal_notes(cmd),
            ProOrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

fn payment_note(amount: u64, note: Option<&str>) -> String {
    match note {
        Some(n) => format!("{amount}: {n}"),
        None => amount.to_string(),
    }
}

/// Compute stored lines and order totals for a placement.
///
/// Returns `(lines, subtotal, discount_amount, total_amount)`.
pub(crate) fn price_lines(
    inputs: &[ProOrderLineInput],
    discount_rate: DiscountRate,
    shipping_cost: u64,
) -> Result<(Vec<ProOrderLine>, u64, u64, u64), DomainError> {
    let mut lines = Vec::with_capacity(inputs.len());
    let mut subtotal: u64 = 0;

    for (idx, input) in inputs.iter().enumerate() {
        if input.quantity == 0 {
            return Err(DomainError::validation("order line quantity must be positive"));
        }
        let line_total = input
            .unit_price
            .checked_mul(input.quantity as u64)
            .ok_or_else(|| DomainError::invariant("order line amount overflow"))?;
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or_else(|| DomainError::invariant("order subtotal overflow"))?;
        lines.push(ProOrderLine {
            line_no: (idx as u32) + 1,
            product_id: input.product_id,
            name: input.name.clone(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            line_total,
        });
    }

    let discount_amount = discount_rate.discount_on(subtotal);
    let total_amount = (subtotal - discount_amount)
        .checked_add(shipping_cost)
        .ok_or_else(|| DomainError::invariant("order total overflow"))?;

    Ok((lines, subtotal, discount_amount, total_amount))
}

impl ProOrder {
    fn ensure_exists(&self, tenant_id: TenantId, order_id: ProOrderId) -> Result<(), DomainError> {
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

    fn handle_place(&self, cmd: &PlaceProOrder) -> Result<Vec<ProOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("pro order already exists"));
        }

        if cmd.lines.is_empty() {
            return Err(DomainError::validation("cannot place pro order without lines"));
        }

        let order_number = require_text(&cmd.order_number, "order_number")?;
        let (lines, subtotal, discount_amount, total_amount) =
            price_lines(&cmd.lines, cmd.discount_rate, cmd.shipping_cost)?;

        Ok(vec![ProOrderEvent::ProOrderPlaced(ProOrderPlaced {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            order_number,
            customer_id: cmd.customer_id,
            order_type: cmd.order_type,
            lines,
            subtotal,
            discount_rate: cmd.discount_rate,
            discount_amount,
            shipping_cost: cmd.shipping_cost,
            total_amount,
            payment_due_date: cmd.payment_due_date,
            customer_notes: cmd.customer_notes.clone(),
            origin: cmd.origin.clone(),
            placed_by: cmd.placed_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(
        &self,
        cmd: &UpdateProOrderStatus,
    ) -> Result<Vec<ProOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        Ok(vec![ProOrderEvent::ProOrderStatusChanged(ProOrderStatusChanged {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.status,
            note: cmd.note.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_payment(&self, cmd: &RecordPayment) -> Result<Vec<ProOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        if cmd.amount == 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let new_paid_amount = self
            .paid_amount
            .checked_add(cmd.amount)
            .ok_or_else(|| DomainError::invariant("payment total overflow"))?;

        if new_paid_amount > self.total_amount {
            return Err(DomainError::validation(format!(
                "payment of {} exceeds outstanding balance of {}",
                cmd.amount,
                self.outstanding_amount()
            )));
        }

        Ok(vec![ProOrderEvent::PaymentRecorded(PaymentRecorded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            amount: cmd.amount,
            new_paid_amount,
            note: cmd.note.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_invoice_number(
        &self,
        cmd: &AssignInvoiceNumber,
    ) -> Result<Vec<ProOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        // Invoice numbers are never reassigned.
        if self.invoice_number.is_some() {
            return Ok(vec![]);
        }

        let invoice_number = require_text(&cmd.invoice_number, "invoice_number")?;

        Ok(vec![ProOrderEvent::InvoiceNumberAssigned(InvoiceNumberAssigned {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            invoice_number,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_internal_notes(
        &self,
        cmd: &AddInternalNotes,
    ) -> Result<Vec<ProOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;
        let notes = require_text(&cmd.notes, "internal notes")?;

        Ok(vec![ProOrderEvent::InternalNotesAdded(InternalNotesAdded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            notes,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelProOrder) -> Result<Vec<ProOrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;

        match self.status {
            ProOrderStatus::Completed => {
                return Err(DomainError::invalid_transition(
                    "completed pro orders cannot be cancelled",
                ));
            }
            ProOrderStatus::Cancelled => {
                return Err(DomainError::invalid_transition("pro order is already cancelled"));
            }
            _ => {}
        }

        let reason = cmd
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(vec![ProOrderEvent::ProOrderCancelled(ProOrderCancelled {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            from: self.status,
            reason,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}
