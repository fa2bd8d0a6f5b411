use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_accounts::PartnershipType;
use comptoir_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, HistoryEntry, ProductId, TenantId, UserId,
    require_text,
};
use comptoir_events::{Event, NoticeDraft, Notifiable};

/// Reappro request identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReapproRequestId(pub AggregateId);

impl ReapproRequestId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ReapproRequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Reappro lifecycle.
///
/// `draft → pending → {approved | partial | rejected} → processing → ready →
/// completed`, `cancelled` from any state before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReapproStatus {
    Draft,
    Pending,
    Approved,
    Partial,
    Rejected,
    Processing,
    Ready,
    Completed,
    Cancelled,
}

impl ReapproStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReapproStatus::Draft => "draft",
            ReapproStatus::Pending => "pending",
            ReapproStatus::Approved => "approved",
            ReapproStatus::Partial => "partial",
            ReapproStatus::Rejected => "rejected",
            ReapproStatus::Processing => "processing",
            ReapproStatus::Ready => "ready",
            ReapproStatus::Completed => "completed",
            ReapproStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReapproStatus::Rejected | ReapproStatus::Completed | ReapproStatus::Cancelled
        )
    }

    /// Outcomes of the review step; only approve/reject may produce them.
    pub fn is_decision(self) -> bool {
        matches!(
            self,
            ReapproStatus::Approved | ReapproStatus::Partial | ReapproStatus::Rejected
        )
    }

    pub fn is_convertible(self) -> bool {
        matches!(self, ReapproStatus::Approved | ReapproStatus::Partial)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Pickup,
    Ship,
}

/// Line as entered by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproLineInput {
    pub product_id: ProductId,
    pub name: String,
    pub requested_quantity: u32,
    /// Pro unit price snapshot in smallest currency unit.
    pub unit_price: u64,
    /// Stock level reported by inventory when the request was drafted.
    pub current_stock: u32,
    pub notes: Option<String>,
}

/// Stored line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub name: String,
    pub requested_quantity: u32,
    /// Zero until the request is reviewed; never above `requested_quantity`.
    pub approved_quantity: u32,
    pub unit_price: u64,
    pub current_stock: u32,
    pub notes: Option<String>,
}

/// Admin decision for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemApproval {
    pub product_id: ProductId,
    pub approved_quantity: u32,
}

/// Approved quantity per line, as recorded in the approval event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDecision {
    pub line_no: u32,
    pub approved_quantity: u32,
}

const ACTION_CREATED: &str = "created";
const ACTION_SUBMITTED: &str = "submitted";
const ACTION_REVIEWED: &str = "reviewed";
const ACTION_REJECTED: &str = "rejected";
const ACTION_CONVERTED: &str = "converted_to_order";
const ACTION_STATUS_CHANGE: &str = "status_change";
const ACTION_INTERNAL_NOTES: &str = "internal_notes";
const ACTION_CANCELLED: &str = "cancelled";

/// Aggregate root: ReapproRequest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapproRequest {
    id: ReapproRequestId,
    tenant_id: Option<TenantId>,
    request_number: String,
    customer_id: Option<UserId>,
    partnership_type: PartnershipType,
    lines: Vec<ReapproLine>,
    priority: Priority,
    status: ReapproStatus,
    requested_delivery_date: Option<DateTime<Utc>>,
    estimated_delivery_date: Option<DateTime<Utc>>,
    delivery_method: DeliveryMethod,
    delivery_address: Option<String>,
    customer_notes: Option<String>,
    rejection_reason: Option<String>,
    internal_notes: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    processed_by: Option<UserId>,
    generated_order: Option<AggregateId>,
    history: Vec<HistoryEntry>,
    version: u64,
    created: bool,
}

impl ReapproRequest {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ReapproRequestId) -> Self {
        Self {
            id,
            tenant_id: None,
            request_number: String::new(),
            customer_id: None,
            partnership_type: PartnershipType::Reseller,
            lines: Vec::new(),
            priority: Priority::Normal,
            status: ReapproStatus::Draft,
            requested_delivery_date: None,
            estimated_delivery_date: None,
            delivery_method: DeliveryMethod::Pickup,
            delivery_address: None,
            customer_notes: None,
            rejection_reason: None,
            internal_notes: None,
            processed_at: None,
            processed_by: None,
            generated_order: None,
            history: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ReapproRequestId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn request_number(&self) -> &str {
        &self.request_number
    }

    pub fn customer_id(&self) -> Option<UserId> {
        self.customer_id
    }

    pub fn partnership_type(&self) -> PartnershipType {
        self.partnership_type
    }

    pub fn lines(&self) -> &[ReapproLine] {
        &self.lines
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> ReapproStatus {
        self.status
    }

    pub fn requested_delivery_date(&self) -> Option<DateTime<Utc>> {
        self.requested_delivery_date
    }

    pub fn estimated_delivery_date(&self) -> Option<DateTime<Utc>> {
        self.estimated_delivery_date
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        self.delivery_method
    }

    pub fn delivery_address(&self) -> Option<&str> {
        self.delivery_address.as_deref()
    }

    pub fn customer_notes(&self) -> Option<&str> {
        self.customer_notes.as_deref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn internal_notes(&self) -> Option<&str> {
        self.internal_notes.as_deref()
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn processed_by(&self) -> Option<UserId> {
        self.processed_by
    }

    pub fn generated_order(&self) -> Option<AggregateId> {
        self.generated_order
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

impl AggregateRoot for ReapproRequest {
    type Id = ReapproRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateReapproRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReapproRequest {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub request_number: String,
    pub customer_id: UserId,
    pub partnership_type: PartnershipType,
    pub lines: Vec<ReapproLineInput>,
    pub priority: Priority,
    pub requested_delivery_date: Option<DateTime<Utc>>,
    pub delivery_method: DeliveryMethod,
    /// Overrides the address from the customer's pro profile.
    pub delivery_address: Option<String>,
    pub customer_notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitReapproRequest (requesting customer only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReapproRequest {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveReapproRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveReapproRequest {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    /// Products not listed are approved at 0.
    pub approvals: Vec<ItemApproval>,
    pub note: Option<String>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectReapproRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectReapproRequest {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub reason: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: LinkGeneratedOrder.
///
/// Conditional stamp of the conversion back-reference: fails with
/// `Conflict` when the request already points at an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkGeneratedOrder {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub order_id: AggregateId,
    pub order_number: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateReapproStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReapproStatus {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub status: ReapproStatus,
    pub note: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddReapproNotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddReapproNotes {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub notes: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelReapproRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReapproRequest {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub reason: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReapproRequestCommand {
    Create(CreateReapproRequest),
    Submit(SubmitReapproRequest),
    Approve(ApproveReapproRequest),
    Reject(RejectReapproRequest),
    LinkGeneratedOrder(LinkGeneratedOrder),
    UpdateStatus(UpdateReapproStatus),
    AddInternalNotes(AddReapproNotes),
    Cancel(CancelReapproRequest),
}

/// Event: ReapproRequestCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproRequestCreated {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub request_number: String,
    pub customer_id: UserId,
    pub partnership_type: PartnershipType,
    pub lines: Vec<ReapproLine>,
    pub priority: Priority,
    pub requested_delivery_date: Option<DateTime<Utc>>,
    pub delivery_method: DeliveryMethod,
    pub delivery_address: Option<String>,
    pub customer_notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReapproRequestSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproRequestSubmitted {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReapproRequestApproved.
///
/// `outcome` is `approved`, `partial` or `rejected` depending on the decided
/// quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproRequestApproved {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub decisions: Vec<LineDecision>,
    pub outcome: ReapproStatus,
    pub note: Option<String>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReapproRequestRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproRequestRejected {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub reason: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GeneratedOrderLinked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOrderLinked {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub order_id: AggregateId,
    pub order_number: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReapproStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproStatusChanged {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub from: ReapproStatus,
    pub to: ReapproStatus,
    pub note: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReapproInternalNotesAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproInternalNotesAdded {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub notes: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReapproRequestCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapproRequestCancelled {
    pub tenant_id: TenantId,
    pub request_id: ReapproRequestId,
    pub from: ReapproStatus,
    pub reason: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReapproRequestEvent {
    ReapproRequestCreated(ReapproRequestCreated),
    ReapproRequestSubmitted(ReapproRequestSubmitted),
    ReapproRequestApproved(ReapproRequestApproved),
    ReapproRequestRejected(ReapproRequestRejected),
    GeneratedOrderLinked(GeneratedOrderLinked),
    ReapproStatusChanged(ReapproStatusChanged),
    ReapproInternalNotesAdded(ReapproInternalNotesAdded),
    ReapproRequestCancelled(ReapproRequestCancelled),
}

impl Event for ReapproRequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReapproRequestEvent::ReapproRequestCreated(_) => "reappro.request.created",
            ReapproRequestEvent::ReapproRequestSubmitted(_) => "reappro.request.submitted",
            ReapproRequestEvent::ReapproRequestApproved(_) => "reappro.request.approved",
            ReapproRequestEvent::ReapproRequestRejected(_) => "reappro.request.rejected",
            ReapproRequestEvent::GeneratedOrderLinked(_) => "reappro.request.order_linked",
            ReapproRequestEvent::ReapproStatusChanged(_) => "reappro.request.status_changed",
            ReapproRequestEvent::ReapproInternalNotesAdded(_) => {
                "reappro.request.internal_notes_added"
            }
            ReapproRequestEvent::ReapproRequestCancelled(_) => "reappro.request.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReapproRequestEvent::ReapproRequestCreated(e) => e.occurred_at,
            ReapproRequestEvent::ReapproRequestSubmitted(e) => e.occurred_at,
            ReapproRequestEvent::ReapproRequestApproved(e) => e.occurred_at,
            ReapproRequestEvent::ReapproRequestRejected(e) => e.occurred_at,
            ReapproRequestEvent::GeneratedOrderLinked(e) => e.occurred_at,
            ReapproRequestEvent::ReapproStatusChanged(e) => e.occurred_at,
            ReapproRequestEvent::ReapproInternalNotesAdded(e) => e.occurred_at,
            ReapproRequestEvent::ReapproRequestCancelled(e) => e.occurred_at,
        }
    }
}

impl Notifiable for ReapproRequestEvent {
    fn notice(&self) -> Option<NoticeDraft> {
        match self {
            ReapproRequestEvent::ReapproRequestSubmitted(_) => {
                Some(NoticeDraft::new(ReapproStatus::Pending.as_str(), None))
            }
            ReapproRequestEvent::ReapproRequestApproved(e) => {
                Some(NoticeDraft::new(e.outcome.as_str(), e.note.clone()))
            }
            ReapproRequestEvent::ReapproRequestRejected(e) => Some(NoticeDraft::new(
                ReapproStatus::Rejected.as_str(),
                Some(e.reason.clone()),
            )),
            ReapproRequestEvent::ReapproStatusChanged(e) => {
                Some(NoticeDraft::new(e.to.as_str(), e.note.clone()))
            }
            ReapproRequestEvent::ReapproRequestCancelled(e) => Some(NoticeDraft::new(
                ReapproStatus::Cancelled.as_str(),
                e.reason.clone(),
            )),
            ReapproRequestEvent::ReapproRequestCreated(_)
            | ReapproRequestEvent::GeneratedOrderLinked(_)
            | ReapproRequestEvent::ReapproInternalNotesAdded(_) => None,
        }
    }
}

impl Aggregate for ReapproRequest {
    type Command = ReapproRequestCommand;
    type Event = ReapproRequestEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReapproRequestEvent::ReapproRequestCreated(e) => {
                self.id = e.request_id;
                self.tenant_id = Some(e.tenant_id);
                self.request_number = e.request_number.clone();
                self.customer_id = Some(e.customer_id);
                self.partnership_type = e.partnership_type;
                self.lines = e.lines.clone();
                self.priority = e.priority;
                self.status = ReapproStatus::Draft;
                self.requested_delivery_date = e.requested_delivery_date;
                self.delivery_method = e.delivery_method;
                self.delivery_address = e.delivery_address.clone();
                self.customer_notes = e.customer_notes.clone();
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_CREATED,
                    None,
                    Some(e.customer_id),
                ));
                self.created = true;
            }
            ReapproRequestEvent::ReapproRequestSubmitted(e) => {
                self.status = ReapproStatus::Pending;
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_SUBMITTED,
                    None,
                    Some(e.actor),
                ));
            }
            ReapproRequestEvent::ReapproRequestApproved(e) => {
                for decision in &e.decisions {
                    if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == decision.line_no) {
                        line.approved_quantity = decision.approved_quantity;
                    }
                }
                self.status = e.outcome;
                self.estimated_delivery_date = e.estimated_delivery_date;
                self.processed_at = Some(e.occurred_at);
                self.processed_by = Some(e.actor);
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_REVIEWED,
                    e.note.clone(),
                    Some(e.actor),
                ));
            }
            ReapproRequestEvent::ReapproRequestRejected(e) => {
                for line in &mut self.lines {
                    line.approved_quantity = 0;
                }
                self.status = ReapproStatus::Rejected;
                self.rejection_reason = Some(e.reason.clone());
                self.processed_at = Some(e.occurred_at);
                self.processed_by = Some(e.actor);
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_REJECTED,
                    Some(e.reason.clone()),
                    Some(e.actor),
                ));
            }
            ReapproRequestEvent::GeneratedOrderLinked(e) => {
                self.generated_order = Some(e.order_id);
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_CONVERTED,
                    Some(e.order_number.clone()),
                    Some(e.actor),
                ));
            }
            ReapproRequestEvent::ReapproStatusChanged(e) => {
                self.status = e.to;
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_STATUS_CHANGE,
                    e.note.clone(),
                    Some(e.actor),
                ));
            }
            ReapproRequestEvent::ReapproInternalNotesAdded(e) => {
                self.internal_notes = Some(e.notes.clone());
                self.history.push(HistoryEntry::new(
                    e.occurred_at,
                    ACTION_INTERNAL_NOTES,
                    None,
                    Some(e.actor),
                ));
            }
            ReapproRequestEvent::ReapproRequestCancelled(e) => {
                self.status = ReapproStatus::Cancelled;
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
            ReapproRequestCommand::Create(cmd) => self.handle_create(cmd),
            ReapproRequestCommand::Submit(cmd) => self.handle_submit(cmd),
            ReapproRequestCommand::Approve(cmd) => self.handle_approve(cmd),
            ReapproRequestCommand::Reject(cmd) => self.handle_reject(cmd),
            ReapproRequestCommand::LinkGeneratedOrder(cmd) => self.handle_link_order(cmd),
            ReapproRequestCommand::UpdateStatus(cmd) => self.handle_update_status(cmd),
            ReapproRequestCommand::AddInternalNotes(cmd) => self.handle_add_notes(cmd),
            ReapproRequestCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

/// Status implied by a set of per-line decisions.
pub(crate) fn derive_outcome(lines: &[ReapproLine], decisions: &[LineDecision]) -> ReapproStatus {
    let approved_of = |line: &ReapproLine| {
        decisions
            .iter()
            .find(|d| d.line_no == line.line_no)
            .map_or(0, |d| d.approved_quantity)
    };

    if lines.iter().all(|l| approved_of(l) == l.requested_quantity) {
        ReapproStatus::Approved
    } else if lines.iter().all(|l| approved_of(l) == 0) {
        ReapproStatus::Rejected
    } else {
        ReapproStatus::Partial
    }
}

impl ReapproRequest {
    fn ensure_exists(
        &self,
        tenant_id: TenantId,
        request_id: ReapproRequestId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != request_id {
            return Err(DomainError::invariant("request_id mismatch"));
        }
        Ok(())
    }

    fn ensure_status(&self, expected: ReapproStatus, action: &str) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} a reappro request that is {} (expected {})",
                self.status.as_str(),
                expected.as_str()
            )));
        }
        Ok(())
    }

    /// Whether the request may be turned into a Pro order now.
    pub fn ensure_convertible(&self) -> Result<(), DomainError> {
        if let Some(order_id) = self.generated_order {
            return Err(DomainError::conflict(format!(
                "reappro request {} was already converted into order {order_id}",
                self.request_number
            )));
        }
        if !self.status.is_convertible() {
            return Err(DomainError::invalid_transition(format!(
                "only approved or partial reappro requests can be converted (status: {})",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreateReapproRequest,
    ) -> Result<Vec<ReapproRequestEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("reappro request already exists"));
        }

        let request_number = require_text(&cmd.request_number, "request_number")?;

        if cmd.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot create a reappro request without lines",
            ));
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(cmd.lines.len());
        for (idx, input) in cmd.lines.iter().enumerate() {
            if input.requested_quantity == 0 {
                return Err(DomainError::validation("requested quantity must be positive"));
            }
            if !seen.insert(input.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} appears on more than one line",
                    input.product_id
                )));
            }
            lines.push(ReapproLine {
                line_no: (idx as u32) + 1,
                product_id: input.product_id,
                name: input.name.clone(),
                requested_quantity: input.requested_quantity,
                approved_quantity: 0,
                unit_price: input.unit_price,
                current_stock: input.current_stock,
                notes: input.notes.clone(),
            });
        }

        Ok(vec![ReapproRequestEvent::ReapproRequestCreated(ReapproRequestCreated {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            request_number,
            customer_id: cmd.customer_id,
            partnership_type: cmd.partnership_type,
            lines,
            priority: cmd.priority,
            requested_delivery_date: cmd.requested_delivery_date,
            delivery_method: cmd.delivery_method,
            delivery_address: cmd.delivery_address.clone(),
            customer_notes: cmd.customer_notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(
        &self,
        cmd: &SubmitReapproRequest,
    ) -> Result<Vec<ReapproRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;

        if self.customer_id != Some(cmd.actor) {
            return Err(DomainError::Unauthorized);
        }
        self.ensure_status(ReapproStatus::Draft, "submit")?;

        Ok(vec![ReapproRequestEvent::ReapproRequestSubmitted(ReapproRequestSubmitted {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(
        &self,
        cmd: &ApproveReapproRequest,
    ) -> Result<Vec<ReapproRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;
        self.ensure_status(ReapproStatus::Pending, "approve")?;

        let mut decisions: Vec<LineDecision> = self
            .lines
            .iter()
            .map(|l| LineDecision {
                line_no: l.line_no,
                approved_quantity: 0,
            })
            .collect();
        let mut decided = HashSet::new();

        for approval in &cmd.approvals {
            let Some(idx) = self
                .lines
                .iter()
                .position(|l| l.product_id == approval.product_id)
            else {
                return Err(DomainError::validation(format!(
                    "product {} is not part of this request",
                    approval.product_id
                )));
            };
            if !decided.insert(approval.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} is approved more than once",
                    approval.product_id
                )));
            }

            let line = &self.lines[idx];
            if approval.approved_quantity > line.requested_quantity {
                return Err(DomainError::validation(format!(
                    "approved quantity {} exceeds requested quantity {} for {}",
                    approval.approved_quantity, line.requested_quantity, line.name
                )));
            }
            decisions[idx].approved_quantity = approval.approved_quantity;
        }

        let outcome = derive_outcome(&self.lines, &decisions);

        Ok(vec![ReapproRequestEvent::ReapproRequestApproved(ReapproRequestApproved {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            decisions,
            outcome,
            note: cmd.note.clone(),
            estimated_delivery_date: cmd.estimated_delivery_date,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(
        &self,
        cmd: &RejectReapproRequest,
    ) -> Result<Vec<ReapproRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;
        let reason = require_text(&cmd.reason, "rejection reason")?;
        self.ensure_status(ReapproStatus::Pending, "reject")?;

        Ok(vec![ReapproRequestEvent::ReapproRequestRejected(ReapproRequestRejected {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            reason,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_link_order(
        &self,
        cmd: &LinkGeneratedOrder,
    ) -> Result<Vec<ReapproRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;
        self.ensure_convertible()?;

        Ok(vec![ReapproRequestEvent::GeneratedOrderLinked(GeneratedOrderLinked {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(
        &self,
        cmd: &UpdateReapproStatus,
    ) -> Result<Vec<ReapproRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;

        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "reappro request is {} and can no longer change status",
                self.status.as_str()
            )));
        }
        if cmd.status.is_decision() {
            return Err(DomainError::invalid_transition(format!(
                "status {} can only be reached through approve or reject",
                cmd.status.as_str()
            )));
        }

        Ok(vec![ReapproRequestEvent::ReapproStatusChanged(ReapproStatusChanged {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            from: self.status,
            to: cmd.status,
            note: cmd.note.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_notes(
        &self,
        cmd: &AddReapproNotes,
    ) -> Result<Vec<ReapproRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;
        let notes = require_text(&cmd.notes, "internal notes")?;

        Ok(vec![ReapproRequestEvent::ReapproInternalNotesAdded(ReapproInternalNotesAdded {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            notes,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(
        &self,
        cmd: &CancelReapproRequest,
    ) -> Result<Vec<ReapproRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;

        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "cannot cancel a reappro request that is {}",
                self.status.as_str()
            )));
        }

        let reason = cmd
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(vec![ReapproRequestEvent::ReapproRequestCancelled(ReapproRequestCancelled {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            from: self.status,
            reason,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}
