//! Payment status derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment standing of a Pro order.
///
/// Never stored: always recomputed from the payment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl PaymentStatus {
    /// Derive the status from `(paid, total, due date)` as seen at `as_of`.
    ///
    /// Once the due date has passed, any outstanding balance is `Overdue`,
    /// whether or not part of it was paid.
    pub fn derive(
        paid_amount: u64,
        total_amount: u64,
        due_date: Option<DateTime<Utc>>,
        as_of: DateTime<Utc>,
    ) -> Self {
        if paid_amount >= total_amount {
            return PaymentStatus::Paid;
        }
        if due_date.is_some_and(|due| as_of > due) {
            return PaymentStatus::Overdue;
        }
        if paid_amount > 0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn derivation_table() {
        let now = Utc::now();
        let future = Some(now + Duration::days(5));
        let past = Some(now - Duration::days(1));

        assert_eq!(PaymentStatus::derive(0, 1_000, future, now), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::derive(0, 1_000, None, now), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::derive(400, 1_000, future, now), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::derive(1_000, 1_000, past, now), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::derive(0, 1_000, past, now), PaymentStatus::Overdue);
        assert_eq!(PaymentStatus::derive(400, 1_000, past, now), PaymentStatus::Overdue);
    }

    #[test]
    fn zero_total_is_paid() {
        assert_eq!(PaymentStatus::derive(0, 0, None, Utc::now()), PaymentStatus::Paid);
    }
}
