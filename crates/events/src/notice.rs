//! Status notices handed to the notification collaborator.
//!
//! The engine never delivers notifications itself. After a status change or
//! a rejection is committed it publishes a `StatusNotice`; whatever sits on
//! the other side of the bus (mailer, SMS gateway, audit log) owns delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{AggregateId, TenantId};

/// `{entity, new status, note}` record emitted after a committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub tenant_id: TenantId,
    /// Aggregate type of the entity (e.g. "reappro.request").
    pub entity_type: String,
    pub entity_id: AggregateId,
    /// Wire name of the status the entity is now in.
    pub new_status: String,
    /// Free text for the recipient; always set for rejections.
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Status-relevant projection of a domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeDraft {
    pub new_status: &'static str,
    pub note: Option<String>,
}

/// Implemented by domain event enums whose variants may warrant a notice.
pub trait Notifiable {
    /// `None` for events that do not change a customer-visible status.
    fn notice(&self) -> Option<NoticeDraft>;
}

impl NoticeDraft {
    pub fn new(new_status: &'static str, note: Option<String>) -> Self {
        Self { new_status, note }
    }

    pub fn into_notice(
        self,
        tenant_id: TenantId,
        entity_type: impl Into<String>,
        entity_id: AggregateId,
        occurred_at: DateTime<Utc>,
    ) -> StatusNotice {
        StatusNotice {
            tenant_id,
            entity_type: entity_type.into(),
            entity_id,
            new_status: self.new_status.to_string(),
            note: self.note,
            occurred_at,
        }
    }
}
