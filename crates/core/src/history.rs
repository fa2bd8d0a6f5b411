//! Append-only audit trail carried by orders and requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;
use crate::value_object::ValueObject;

/// One `{date, action, note}` line of an entity's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    /// Stable action name (e.g. "status_change", "payment").
    pub action: String,
    pub note: Option<String>,
    pub actor: Option<UserId>,
}

impl ValueObject for HistoryEntry {}

impl HistoryEntry {
    pub fn new(
        date: DateTime<Utc>,
        action: impl Into<String>,
        note: Option<String>,
        actor: Option<UserId>,
    ) -> Self {
        Self {
            date,
            action: action.into(),
            note,
            actor,
        }
    }
}
