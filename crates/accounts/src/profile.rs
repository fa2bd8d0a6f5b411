use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{DiscountRate, ValueObject};

/// Commercial arrangement a Pro customer operates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnershipType {
    Reseller,
    Consignment,
    Distributor,
}

impl PartnershipType {
    pub fn as_str(self) -> &'static str {
        match self {
            PartnershipType::Reseller => "reseller",
            PartnershipType::Consignment => "consignment",
            PartnershipType::Distributor => "distributor",
        }
    }
}

/// Commercial tier of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProStatus {
    None,
    Pending,
    Approved,
    Suspended,
}

impl ProStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProStatus::None => "none",
            ProStatus::Pending => "pending",
            ProStatus::Approved => "approved",
            ProStatus::Suspended => "suspended",
        }
    }
}

/// Pro commercial profile attached to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProInfo {
    pub company_name: String,
    /// New-Caledonia business tax identifier.
    pub ridet_number: String,
    pub partnership_type: PartnershipType,
    pub discount_rate: DiscountRate,
    pub address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
}

impl ValueObject for ProInfo {}
