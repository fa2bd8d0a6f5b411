use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, TenantId, UserId, require_text,
};
use comptoir_events::{Event, NoticeDraft, Notifiable};

use crate::profile::{ProInfo, ProStatus};

/// Customer identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub AggregateId);

impl CustomerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// The customer stream of a user shares the user's UUID.
    pub fn for_user(user_id: UserId) -> Self {
        Self(AggregateId::from_uuid(*user_id.as_uuid()))
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Customer (commercial side of a user account).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id: CustomerId,
    tenant_id: Option<TenantId>,
    user_id: Option<UserId>,
    display_name: String,
    email: String,
    pro_status: ProStatus,
    pro_info: Option<ProInfo>,
    granted_by_request: Option<AggregateId>,
    version: u64,
    created: bool,
}

impl Customer {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CustomerId) -> Self {
        Self {
            id,
            tenant_id: None,
            user_id: None,
            display_name: String::new(),
            email: String::new(),
            pro_status: ProStatus::None,
            pro_info: None,
            granted_by_request: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> CustomerId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn pro_status(&self) -> ProStatus {
        self.pro_status
    }

    /// Derived from `pro_status`; a suspended Pro is not a Pro.
    pub fn is_pro(&self) -> bool {
        self.pro_status == ProStatus::Approved
    }

    pub fn pro_info(&self) -> Option<&ProInfo> {
        self.pro_info.as_ref()
    }

    pub fn granted_by_request(&self) -> Option<AggregateId> {
        self.granted_by_request
    }
}

impl AggregateRoot for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterCustomer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCustomer {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub user_id: UserId,
    pub display_name: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: GrantPro (issued after a Pro request was approved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPro {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub request_id: AggregateId,
    pub pro_info: ProInfo,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProProfile (direct admin edit, bypasses the request flow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProProfile {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub pro_status: ProStatus,
    /// Replacement profile; `None` keeps the current one.
    pub pro_info: Option<ProInfo>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SuspendPro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendPro {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub reason: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReinstatePro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinstatePro {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerCommand {
    Register(RegisterCustomer),
    GrantPro(GrantPro),
    UpdateProProfile(UpdateProProfile),
    SuspendPro(SuspendPro),
    ReinstatePro(ReinstatePro),
}

/// Event: CustomerRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRegistered {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub user_id: UserId,
    pub display_name: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProGranted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProGranted {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub request_id: AggregateId,
    pub pro_info: ProInfo,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProProfileUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProProfileUpdated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub pro_status: ProStatus,
    pub pro_info: Option<ProInfo>,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProSuspended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProSuspended {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub reason: String,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProReinstated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProReinstated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerEvent {
    CustomerRegistered(CustomerRegistered),
    ProGranted(ProGranted),
    ProProfileUpdated(ProProfileUpdated),
    ProSuspended(ProSuspended),
    ProReinstated(ProReinstated),
}

impl Event for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::CustomerRegistered(_) => "accounts.customer.registered",
            CustomerEvent::ProGranted(_) => "accounts.customer.pro_granted",
            CustomerEvent::ProProfileUpdated(_) => "accounts.customer.pro_profile_updated",
            CustomerEvent::ProSuspended(_) => "accounts.customer.pro_suspended",
            CustomerEvent::ProReinstated(_) => "accounts.customer.pro_reinstated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CustomerEvent::CustomerRegistered(e) => e.occurred_at,
            CustomerEvent::ProGranted(e) => e.occurred_at,
            CustomerEvent::ProProfileUpdated(e) => e.occurred_at,
            CustomerEvent::ProSuspended(e) => e.occurred_at,
            CustomerEvent::ProReinstated(e) => e.occurred_at,
        }
    }
}

impl Notifiable for CustomerEvent {
    fn notice(&self) -> Option<NoticeDraft> {
        match self {
            CustomerEvent::CustomerRegistered(_) => None,
            CustomerEvent::ProGranted(_) | CustomerEvent::ProReinstated(_) => {
                Some(NoticeDraft::new(ProStatus::Approved.as_str(), None))
            }
            CustomerEvent::ProProfileUpdated(e) => {
                Some(NoticeDraft::new(e.pro_status.as_str(), None))
            }
            CustomerEvent::ProSuspended(e) => Some(NoticeDraft::new(
                ProStatus::Suspended.as_str(),
                Some(e.reason.clone()),
            )),
        }
    }
}

impl Aggregate for Customer {
    type Command = CustomerCommand;
    type Event = CustomerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CustomerEvent::CustomerRegistered(e) => {
                self.id = e.customer_id;
                self.tenant_id = Some(e.tenant_id);
                self.user_id = Some(e.user_id);
                self.display_name = e.display_name.clone();
                self.email = e.email.clone();
                self.pro_status = ProStatus::None;
                self.created = true;
            }
            CustomerEvent::ProGranted(e) => {
                self.pro_status = ProStatus::Approved;
                self.pro_info = Some(e.pro_info.clone());
                self.granted_by_request = Some(e.request_id);
            }
            CustomerEvent::ProProfileUpdated(e) => {
                self.pro_status = e.pro_status;
                if let Some(info) = &e.pro_info {
                    self.pro_info = Some(info.clone());
                }
            }
            CustomerEvent::ProSuspended(_) => {
                self.pro_status = ProStatus::Suspended;
            }
            CustomerEvent::ProReinstated(_) => {
                self.pro_status = ProStatus::Approved;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CustomerCommand::Register(cmd) => self.handle_register(cmd),
            CustomerCommand::GrantPro(cmd) => self.handle_grant_pro(cmd),
            CustomerCommand::UpdateProProfile(cmd) => self.handle_update_pro_profile(cmd),
            CustomerCommand::SuspendPro(cmd) => self.handle_suspend(cmd),
            CustomerCommand::ReinstatePro(cmd) => self.handle_reinstate(cmd),
        }
    }
}

fn validate_pro_info(info: &ProInfo) -> Result<(), DomainError> {
    require_text(&info.company_name, "company name")?;
    require_text(&info.ridet_number, "RIDET number")?;
    Ok(())
}

impl Customer {
    fn ensure_exists(&self, tenant_id: TenantId, customer_id: CustomerId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != customer_id {
            return Err(DomainError::invariant("customer_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterCustomer) -> Result<Vec<CustomerEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("customer already exists"));
        }

        let display_name = require_text(&cmd.display_name, "display name")?;
        let email = require_text(&cmd.email, "email")?;
        if !email.contains('@') {
            return Err(DomainError::validation("email must contain '@'"));
        }

        Ok(vec![CustomerEvent::CustomerRegistered(CustomerRegistered {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            user_id: cmd.user_id,
            display_name,
            email,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_grant_pro(&self, cmd: &GrantPro) -> Result<Vec<CustomerEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.customer_id)?;

        match (self.pro_status, self.granted_by_request) {
            // Replay of the same approval.
            (ProStatus::Approved, Some(request_id)) if request_id == cmd.request_id => {
                return Ok(vec![]);
            }
            (ProStatus::Approved, _) => {
                return Err(DomainError::invalid_transition("customer is already a pro"));
            }
            (ProStatus::Suspended, _) => {
                return Err(DomainError::invalid_transition(
                    "suspended pro accounts must be reinstated, not re-granted",
                ));
            }
            _ => {}
        }

        validate_pro_info(&cmd.pro_info)?;

        Ok(vec![CustomerEvent::ProGranted(ProGranted {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            request_id: cmd.request_id,
            pro_info: cmd.pro_info.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_pro_profile(
        &self,
        cmd: &UpdateProProfile,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.customer_id)?;

        if let Some(info) = &cmd.pro_info {
            validate_pro_info(info)?;
        }

        let has_profile = cmd.pro_info.is_some() || self.pro_info.is_some();
        if cmd.pro_status == ProStatus::Approved && !has_profile {
            return Err(DomainError::validation(
                "an approved pro status requires a pro profile",
            ));
        }

        Ok(vec![CustomerEvent::ProProfileUpdated(ProProfileUpdated {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            pro_status: cmd.pro_status,
            pro_info: cmd.pro_info.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendPro) -> Result<Vec<CustomerEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.customer_id)?;
        let reason = require_text(&cmd.reason, "suspension reason")?;

        if self.pro_status != ProStatus::Approved {
            return Err(DomainError::invalid_transition(format!(
                "only approved pro accounts can be suspended (status: {})",
                self.pro_status.as_str()
            )));
        }

        Ok(vec![CustomerEvent::ProSuspended(ProSuspended {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            reason,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reinstate(&self, cmd: &ReinstatePro) -> Result<Vec<CustomerEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.customer_id)?;

        if self.pro_status != ProStatus::Suspended {
            return Err(DomainError::invalid_transition(format!(
                "only suspended pro accounts can be reinstated (status: {})",
                self.pro_status.as_str()
            )));
        }

        Ok(vec![CustomerEvent::ProReinstated(ProReinstated {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}
