use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use comptoir_accounts::{
    ApproveProRequest, CompanyIdentity, ContactDetails, Customer, CustomerCommand, CustomerId,
    GrantPro, PartnershipType, ProRequest, ProRequestCommand, ProRequestId, ProRequestStatus,
    ProStatus, SubmitProRequest,
};
use comptoir_core::{AggregateId, ExpectedVersion, TenantId, UserId};
use comptoir_events::{EventBus, EventEnvelope, StatusNotice};

use super::Engine;
use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStore;

/// Pro account application filed by a customer.
#[derive(Debug, Clone)]
pub struct SubmitProRequestInput {
    pub tenant_id: TenantId,
    pub applicant: UserId,
    pub company: CompanyIdentity,
    pub contact: ContactDetails,
    pub partnership_type: PartnershipType,
    pub message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl<S, B, N> Engine<S, B, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    N: EventBus<StatusNotice>,
{
    /// File a Pro application for a registered customer.
    ///
    /// Suspended accounts must be reinstated rather than re-apply.
    pub fn submit_pro_request(
        &self,
        input: SubmitProRequestInput,
    ) -> Result<ProRequest, DispatchError> {
        let applicant = self.grantable_applicant(input.tenant_id, input.applicant, None)?;

        self.execute_expecting::<ProRequest>(
            ProRequestCommand::Submit(SubmitProRequest {
                tenant_id: input.tenant_id,
                request_id: ProRequestId::new(AggregateId::new()),
                applicant: input.applicant,
                applicant_pro_status: applicant.pro_status(),
                company: input.company,
                contact: input.contact,
                partnership_type: input.partnership_type,
                message: input.message,
                occurred_at: input.occurred_at,
            }),
            ExpectedVersion::Exact(0),
        )
    }

    /// Approve a pending request and promote the applicant to Pro.
    ///
    /// The applicant's record is checked before anything is written, so an
    /// applicant that cannot be promoted leaves the request pending. The two
    /// writes are still separate commits. If the customer update fails after
    /// the approval, `sync_customer_tier` finishes the job.
    pub fn approve_pro_request(
        &self,
        tenant_id: TenantId,
        request_id: ProRequestId,
        discount_rate: u8,
        admin_notes: Option<String>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Result<(ProRequest, Customer), DispatchError> {
        let pending: ProRequest = self.load(tenant_id, request_id.0)?;
        let Some(applicant) = pending.applicant() else {
            return Err(DispatchError::InvariantViolation(
                "pro request has no applicant".to_string(),
            ));
        };
        self.grantable_applicant(tenant_id, applicant, Some(request_id))?;

        let request = self.execute::<ProRequest>(ProRequestCommand::Approve(ApproveProRequest {
            tenant_id,
            request_id,
            discount_rate,
            admin_notes,
            actor,
            occurred_at,
        }))?;

        let customer = self.sync_customer_tier(tenant_id, request_id, actor, occurred_at)?;
        Ok((request, customer))
    }

    /// Customer record of an applicant that may still be promoted.
    ///
    /// `granting` is the request being approved. A customer already made Pro
    /// by that same request passes so a retried approval can complete.
    fn grantable_applicant(
        &self,
        tenant_id: TenantId,
        applicant: UserId,
        granting: Option<ProRequestId>,
    ) -> Result<Customer, DispatchError> {
        let customer: Option<Customer> =
            self.load_optional(tenant_id, CustomerId::for_user(applicant).0)?;
        let Some(customer) = customer else {
            return Err(DispatchError::NotFound);
        };

        match customer.pro_status() {
            ProStatus::Suspended => Err(DispatchError::InvalidTransition(
                "suspended pro accounts must be reinstated".to_string(),
            )),
            ProStatus::Approved
                if granting.is_some()
                    && customer.granted_by_request() != granting.map(|id| id.0) =>
            {
                Err(DispatchError::InvalidTransition(
                    "applicant is already a pro".to_string(),
                ))
            }
            _ => Ok(customer),
        }
    }

    /// Copy the outcome of an approved request onto the applicant's record.
    ///
    /// Safe to repeat: granting from the same request twice is a no-op.
    pub fn sync_customer_tier(
        &self,
        tenant_id: TenantId,
        request_id: ProRequestId,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Customer, DispatchError> {
        let request: ProRequest = self.load(tenant_id, request_id.0)?;
        if request.status() != ProRequestStatus::Approved {
            return Err(DispatchError::InvalidTransition(format!(
                "pro request is {}, not approved",
                request.status().as_str()
            )));
        }

        let (Some(applicant), Some(pro_info)) = (request.applicant(), request.pro_info()) else {
            return Err(DispatchError::InvariantViolation(
                "approved pro request is missing applicant details".to_string(),
            ));
        };

        let customer = self.execute::<Customer>(CustomerCommand::GrantPro(GrantPro {
            tenant_id,
            customer_id: CustomerId::for_user(applicant),
            request_id: request_id.0,
            pro_info,
            actor,
            occurred_at,
        }))?;

        info!(
            tenant_id = %tenant_id,
            request_id = %request_id,
            customer_id = %customer.id_typed(),
            "customer promoted to pro"
        );
        Ok(customer)
    }
}
