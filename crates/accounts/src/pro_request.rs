use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{
    Aggregate, AggregateId, AggregateRoot, DiscountRate, DomainError, TenantId, UserId,
    require_text,
};
use comptoir_events::{Event, NoticeDraft, Notifiable};

use crate::profile::{PartnershipType, ProInfo, ProStatus};

/// Pro request identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProRequestId(pub AggregateId);

impl ProRequestId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProRequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Pro request lifecycle: `pending` then exactly one terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProRequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ProRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProRequestStatus::Pending => "pending",
            ProRequestStatus::Approved => "approved",
            ProRequestStatus::Rejected => "rejected",
            ProRequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != ProRequestStatus::Pending
    }
}

/// Legal identity of the applying company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    pub company_name: String,
    pub ridet_number: String,
    pub legal_form: Option<String>,
    pub activity: Option<String>,
}

/// Who to talk to at the applying company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Aggregate root: ProRequest (application to the Pro tier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProRequest {
    id: ProRequestId,
    tenant_id: Option<TenantId>,
    applicant: Option<UserId>,
    company: Option<CompanyIdentity>,
    contact: Option<ContactDetails>,
    partnership_type: PartnershipType,
    message: Option<String>,
    status: ProRequestStatus,
    admin_notes: Option<String>,
    rejection_reason: Option<String>,
    approved_discount_rate: Option<DiscountRate>,
    submitted_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
    processed_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl ProRequest {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProRequestId) -> Self {
        Self {
            id,
            tenant_id: None,
            applicant: None,
            company: None,
            contact: None,
            partnership_type: PartnershipType::Reseller,
            message: None,
            status: ProRequestStatus::Pending,
            admin_notes: None,
            rejection_reason: None,
            approved_discount_rate: None,
            submitted_at: None,
            processed_at: None,
            processed_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProRequestId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn applicant(&self) -> Option<UserId> {
        self.applicant
    }

    pub fn company(&self) -> Option<&CompanyIdentity> {
        self.company.as_ref()
    }

    pub fn contact(&self) -> Option<&ContactDetails> {
        self.contact.as_ref()
    }

    pub fn partnership_type(&self) -> PartnershipType {
        self.partnership_type
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn status(&self) -> ProRequestStatus {
        self.status
    }

    pub fn admin_notes(&self) -> Option<&str> {
        self.admin_notes.as_deref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn approved_discount_rate(&self) -> Option<DiscountRate> {
        self.approved_discount_rate
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn processed_by(&self) -> Option<UserId> {
        self.processed_by
    }

    /// Profile the applicant is granted, once the request is approved.
    pub fn pro_info(&self) -> Option<ProInfo> {
        if self.status != ProRequestStatus::Approved {
            return None;
        }
        let company = self.company.as_ref()?;
        let contact = self.contact.as_ref()?;

        Some(ProInfo {
            company_name: company.company_name.clone(),
            ridet_number: company.ridet_number.clone(),
            partnership_type: self.partnership_type,
            discount_rate: self.approved_discount_rate?,
            address: contact.address.clone(),
            contact_name: Some(contact.name.clone()),
            contact_email: Some(contact.email.clone()),
            contact_phone: contact.phone.clone(),
            approved_at: self.processed_at,
            admin_notes: self.admin_notes.clone(),
        })
    }
}

impl AggregateRoot for ProRequest {
    type Id = ProRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitProRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProRequest {
    pub tenant_id: TenantId,
    pub request_id: ProRequestId,
    pub applicant: UserId,
    /// Applicant's tier at submission time, read from the customer record.
    pub applicant_pro_status: ProStatus,
    pub company: CompanyIdentity,
    pub contact: ContactDetails,
    pub partnership_type: PartnershipType,
    pub message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveProRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveProRequest {
    pub tenant_id: TenantId,
    pub request_id: ProRequestId,
    /// Raw percentage; validated against `[0, 100]`.
    pub discount_rate: u8,
    pub admin_notes: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectProRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectProRequest {
    pub tenant_id: TenantId,
    pub request_id: ProRequestId,
    pub reason: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelProRequest (applicant only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelProRequest {
    pub tenant_id: TenantId,
    pub request_id: ProRequestId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProRequestCommand {
    Submit(SubmitProRequest),
    Approve(ApproveProRequest),
    Reject(RejectProRequest),
    Cancel(CancelProRequest),
}

/// Event: ProRequestSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRequestSubmitted {
    pub tenant_id: TenantId,
    pub request_id: ProRequestId,
    pub applicant: UserId,
    pub company: CompanyIdentity,
    pub contact: ContactDetails,
    pub partnership_type: PartnershipType,
    pub message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProRequestApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRequestApproved {
    pub tenant_id: TenantId,
    pub request_id: ProRequestId,
    pub applicant: UserId,
    pub discount_rate: DiscountRate,
    pub admin_notes: Option<String>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProRequestRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRequestRejected {
    pub tenant_id: TenantId,
    pub request_id: ProRequestId,
    pub reason: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProRequestCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRequestCancelled {
    pub tenant_id: TenantId,
    pub request_id: ProRequestId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProRequestEvent {
    ProRequestSubmitted(ProRequestSubmitted),
    ProRequestApproved(ProRequestApproved),
    ProRequestRejected(ProRequestRejected),
    ProRequestCancelled(ProRequestCancelled),
}

impl Event for ProRequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProRequestEvent::ProRequestSubmitted(_) => "accounts.pro_request.submitted",
            ProRequestEvent::ProRequestApproved(_) => "accounts.pro_request.approved",
            ProRequestEvent::ProRequestRejected(_) => "accounts.pro_request.rejected",
            ProRequestEvent::ProRequestCancelled(_) => "accounts.pro_request.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProRequestEvent::ProRequestSubmitted(e) => e.occurred_at,
            ProRequestEvent::ProRequestApproved(e) => e.occurred_at,
            ProRequestEvent::ProRequestRejected(e) => e.occurred_at,
            ProRequestEvent::ProRequestCancelled(e) => e.occurred_at,
        }
    }
}

impl Notifiable for ProRequestEvent {
    fn notice(&self) -> Option<NoticeDraft> {
        let draft = match self {
            ProRequestEvent::ProRequestSubmitted(_) => {
                NoticeDraft::new(ProRequestStatus::Pending.as_str(), None)
            }
            ProRequestEvent::ProRequestApproved(e) => {
                NoticeDraft::new(ProRequestStatus::Approved.as_str(), e.admin_notes.clone())
            }
            ProRequestEvent::ProRequestRejected(e) => {
                NoticeDraft::new(ProRequestStatus::Rejected.as_str(), Some(e.reason.clone()))
            }
            ProRequestEvent::ProRequestCancelled(_) => {
                NoticeDraft::new(ProRequestStatus::Cancelled.as_str(), None)
            }
        };
        Some(draft)
    }
}

impl Aggregate for ProRequest {
    type Command = ProRequestCommand;
    type Event = ProRequestEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProRequestEvent::ProRequestSubmitted(e) => {
                self.id = e.request_id;
                self.tenant_id = Some(e.tenant_id);
                self.applicant = Some(e.applicant);
                self.company = Some(e.company.clone());
                self.contact = Some(e.contact.clone());
                self.partnership_type = e.partnership_type;
                self.message = e.message.clone();
                self.status = ProRequestStatus::Pending;
                self.submitted_at = Some(e.occurred_at);
                self.created = true;
            }
            ProRequestEvent::ProRequestApproved(e) => {
                self.status = ProRequestStatus::Approved;
                self.approved_discount_rate = Some(e.discount_rate);
                self.admin_notes = e.admin_notes.clone();
                self.processed_at = Some(e.occurred_at);
                self.processed_by = Some(e.actor);
            }
            ProRequestEvent::ProRequestRejected(e) => {
                self.status = ProRequestStatus::Rejected;
                self.rejection_reason = Some(e.reason.clone());
                self.processed_at = Some(e.occurred_at);
                self.processed_by = Some(e.actor);
            }
            ProRequestEvent::ProRequestCancelled(_) => {
                self.status = ProRequestStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProRequestCommand::Submit(cmd) => self.handle_submit(cmd),
            ProRequestCommand::Approve(cmd) => self.handle_approve(cmd),
            ProRequestCommand::Reject(cmd) => self.handle_reject(cmd),
            ProRequestCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl ProRequest {
    fn ensure_exists(&self, tenant_id: TenantId, request_id: ProRequestId) -> Result<(), DomainError> {
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

    fn ensure_pending(&self, action: &str) -> Result<(), DomainError> {
        if self.status != ProRequestStatus::Pending {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} a pro request that is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitProRequest) -> Result<Vec<ProRequestEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("pro request already exists"));
        }

        if cmd.applicant_pro_status == ProStatus::Approved {
            return Err(DomainError::invalid_transition("applicant is already a pro"));
        }

        let company = CompanyIdentity {
            company_name: require_text(&cmd.company.company_name, "company name")?,
            ridet_number: require_text(&cmd.company.ridet_number, "RIDET number")?,
            legal_form: cmd.company.legal_form.clone(),
            activity: cmd.company.activity.clone(),
        };
        let email = require_text(&cmd.contact.email, "contact email")?;
        if !email.contains('@') {
            return Err(DomainError::validation("contact email must contain '@'"));
        }
        let contact = ContactDetails {
            email,
            ..cmd.contact.clone()
        };

        Ok(vec![ProRequestEvent::ProRequestSubmitted(ProRequestSubmitted {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            applicant: cmd.applicant,
            company,
            contact,
            partnership_type: cmd.partnership_type,
            message: cmd.message.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveProRequest) -> Result<Vec<ProRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;
        // Malformed input is reported before the state check.
        let discount_rate = DiscountRate::new(cmd.discount_rate)?;
        self.ensure_pending("approve")?;

        let applicant = self
            .applicant
            .ok_or_else(|| DomainError::invariant("pro request has no applicant"))?;

        Ok(vec![ProRequestEvent::ProRequestApproved(ProRequestApproved {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            applicant,
            discount_rate,
            admin_notes: cmd.admin_notes.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectProRequest) -> Result<Vec<ProRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;
        let reason = require_text(&cmd.reason, "rejection reason")?;
        self.ensure_pending("reject")?;

        Ok(vec![ProRequestEvent::ProRequestRejected(ProRequestRejected {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            reason,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelProRequest) -> Result<Vec<ProRequestEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.request_id)?;

        if self.applicant != Some(cmd.actor) {
            return Err(DomainError::Unauthorized);
        }
        self.ensure_pending("cancel")?;

        Ok(vec![ProRequestEvent::ProRequestCancelled(ProRequestCancelled {
            tenant_id: cmd.tenant_id,
            request_id: cmd.request_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comptoir_events::execute;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn submit_cmd(tenant_id: TenantId, request_id: ProRequestId, applicant: UserId) -> SubmitProRequest {
        SubmitProRequest {
            tenant_id,
            request_id,
            applicant,
            applicant_pro_status: ProStatus::None,
            company: CompanyIdentity {
                company_name: "  Tiaré Distribution ".to_string(),
                ridet_number: "0987654.002".to_string(),
                legal_form: Some("SARL".to_string()),
                activity: Some("Épicerie fine".to_string()),
            },
            contact: ContactDetails {
                name: "Paul".to_string(),
                email: "paul@tiare.nc".to_string(),
                phone: Some("+687 27 00 00".to_string()),
                address: Some("Koné".to_string()),
            },
            partnership_type: PartnershipType::Consignment,
            message: Some("Dépôt-vente en province Nord".to_string()),
            occurred_at: test_time(),
        }
    }

    fn submitted() -> (ProRequest, TenantId, ProRequestId, UserId) {
        let tenant_id = test_tenant_id();
        let request_id = ProRequestId::new(AggregateId::new());
        let applicant = UserId::new();
        let mut request = ProRequest::empty(request_id);
        execute(
            &mut request,
            &ProRequestCommand::Submit(submit_cmd(tenant_id, request_id, applicant)),
        )
        .unwrap();
        (request, tenant_id, request_id, applicant)
    }

    fn approve(tenant_id: TenantId, request_id: ProRequestId, rate: u8) -> ProRequestCommand {
        ProRequestCommand::Approve(ApproveProRequest {
            tenant_id,
            request_id,
            discount_rate: rate,
            admin_notes: Some("bon dossier".to_string()),
            actor: UserId::new(),
            occurred_at: test_time(),
        })
    }

    fn reject(tenant_id: TenantId, request_id: ProRequestId, reason: &str) -> ProRequestCommand {
        ProRequestCommand::Reject(RejectProRequest {
            tenant_id,
            request_id,
            reason: reason.to_string(),
            actor: UserId::new(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn submit_normalizes_company_fields() {
        let (request, _, _, applicant) = submitted();
        assert_eq!(request.status(), ProRequestStatus::Pending);
        assert_eq!(request.applicant(), Some(applicant));
        assert_eq!(request.company().unwrap().company_name, "Tiaré Distribution");
        assert!(request.processed_at().is_none());
    }

    #[test]
    fn submit_requires_ridet_and_rejects_existing_pros() {
        let tenant_id = test_tenant_id();
        let request_id = ProRequestId::new(AggregateId::new());
        let request = ProRequest::empty(request_id);

        let mut cmd = submit_cmd(tenant_id, request_id, UserId::new());
        cmd.company.ridet_number = " ".to_string();
        let err = request.handle(&ProRequestCommand::Submit(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("RIDET")));

        let mut cmd = submit_cmd(tenant_id, request_id, UserId::new());
        cmd.applicant_pro_status = ProStatus::Approved;
        let err = request.handle(&ProRequestCommand::Submit(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn approve_with_out_of_range_rate_is_a_validation_error() {
        let (request, tenant_id, request_id, _) = submitted();
        let err = request.handle(&approve(tenant_id, request_id, 150)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(request.status(), ProRequestStatus::Pending);
    }

    #[test]
    fn approve_sets_processing_fields_once_and_builds_profile() {
        let (mut request, tenant_id, request_id, _) = submitted();
        execute(&mut request, &approve(tenant_id, request_id, 20)).unwrap();

        assert_eq!(request.status(), ProRequestStatus::Approved);
        let processed_at = request.processed_at().unwrap();
        let info = request.pro_info().unwrap();
        assert_eq!(info.discount_rate.percent(), 20);
        assert_eq!(info.partnership_type, PartnershipType::Consignment);
        assert_eq!(info.approved_at, Some(processed_at));
        assert_eq!(info.contact_email.as_deref(), Some("paul@tiare.nc"));

        let err = request.handle(&approve(tenant_id, request_id, 10)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        let err = request.handle(&reject(tenant_id, request_id, "trop tard")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert_eq!(request.processed_at(), Some(processed_at));
    }

    #[test]
    fn reject_requires_a_reason_and_notifies_it() {
        let (mut request, tenant_id, request_id, _) = submitted();

        let err = request.handle(&reject(tenant_id, request_id, "   ")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let events = execute(&mut request, &reject(tenant_id, request_id, " RIDET invalide ")).unwrap();
        assert_eq!(request.status(), ProRequestStatus::Rejected);
        assert_eq!(request.rejection_reason(), Some("RIDET invalide"));
        assert!(request.pro_info().is_none());

        let notice = events[0].notice().unwrap();
        assert_eq!(notice.new_status, "rejected");
        assert_eq!(notice.note.as_deref(), Some("RIDET invalide"));
    }

    #[test]
    fn only_the_applicant_can_cancel_a_pending_request() {
        let (mut request, tenant_id, request_id, applicant) = submitted();
        let cancel = |actor: UserId| {
            ProRequestCommand::Cancel(CancelProRequest {
                tenant_id,
                request_id,
                actor,
                occurred_at: test_time(),
            })
        };

        assert_eq!(request.handle(&cancel(UserId::new())).unwrap_err(), DomainError::Unauthorized);

        execute(&mut request, &cancel(applicant)).unwrap();
        assert_eq!(request.status(), ProRequestStatus::Cancelled);
        assert!(request.processed_at().is_none());

        let err = request.handle(&cancel(applicant)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: approval succeeds exactly for rates in [0, 100].
            #[test]
            fn approval_accepts_only_percentages(rate in any::<u8>()) {
                let (mut request, tenant_id, request_id, _) = submitted();
                let result = execute(&mut request, &approve(tenant_id, request_id, rate));

                if rate <= 100 {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(request.approved_discount_rate().map(|r| r.percent()), Some(rate));
                } else {
                    prop_assert!(matches!(result, Err(DomainError::Validation(_))));
                    prop_assert_eq!(request.status(), ProRequestStatus::Pending);
                }
            }
        }
    }
}
