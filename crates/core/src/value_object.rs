//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Negotiated Pro discount, in whole percent (0–100 inclusive).
///
/// Construction is the only validation point; a `DiscountRate` in hand is
/// always in range, including after deserialization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DiscountRate(u8);

impl ValueObject for DiscountRate {}

impl DiscountRate {
    pub const MAX_PERCENT: u8 = 100;

    pub fn new(percent: u8) -> DomainResult<Self> {
        if percent > Self::MAX_PERCENT {
            return Err(DomainError::validation(format!(
                "discount rate must be between 0 and 100 (got {percent})"
            )));
        }
        Ok(Self(percent))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Discount amount for `amount` minor units, rounded half-up.
    ///
    /// Never exceeds `amount`.
    pub fn discount_on(self, amount: u64) -> u64 {
        let scaled = (amount as u128) * (self.0 as u128) + 50;
        (scaled / 100) as u64
    }
}

impl TryFrom<u8> for DiscountRate {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DiscountRate> for u8 {
    fn from(value: DiscountRate) -> Self {
        value.0
    }
}

impl core::fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_above_hundred_is_rejected() {
        assert!(DiscountRate::new(100).is_ok());
        assert!(matches!(DiscountRate::new(150), Err(DomainError::Validation(_))));
    }

    #[test]
    fn discount_rounds_half_up_and_stays_bounded() {
        let rate = DiscountRate::new(15).unwrap();
        assert_eq!(rate.discount_on(10_000), 1_500);
        // 333 * 15% = 49.95 -> 50
        assert_eq!(rate.discount_on(333), 50);

        let full = DiscountRate::new(100).unwrap();
        assert_eq!(full.discount_on(u64::MAX), u64::MAX);
    }

    #[test]
    fn deserializing_out_of_range_rate_fails() {
        assert!(serde_json::from_str::<DiscountRate>("20").is_ok());
        assert!(serde_json::from_str::<DiscountRate>("150").is_err());
    }
}
