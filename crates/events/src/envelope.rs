use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use comptoir_core::{AggregateId, TenantId};

/// Where a committed event sits and what it is, independent of its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    /// Stream type tag, e.g. "reappro.request".
    pub aggregate_type: String,
    /// Position in the stream, starting at 1.
    pub sequence_number: u64,
    /// Event name, e.g. "pro.order.payment_recorded".
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
}

/// A committed event as published on the bus.
///
/// Consumers filter on the header (tenant, stream, event type) and only
/// decode the payload when they care about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    #[serde(flatten)]
    header: EnvelopeHeader,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(header: EnvelopeHeader, payload: E) -> Self {
        Self { header, payload }
    }

    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    pub fn event_id(&self) -> Uuid {
        self.header.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.header.tenant_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.header.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.header.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.header.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.header.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.header.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap()
    }

    #[test]
    fn header_fields_are_exposed_through_accessors() {
        let header = EnvelopeHeader {
            event_id: Uuid::now_v7(),
            tenant_id: TenantId::new(),
            aggregate_id: AggregateId::new(),
            aggregate_type: "retail.order".to_string(),
            sequence_number: 3,
            event_type: "retail.order.paid".to_string(),
            occurred_at: test_time(),
        };
        let envelope = EventEnvelope::new(header.clone(), 42u32);

        assert_eq!(envelope.header(), &header);
        assert_eq!(envelope.aggregate_type(), "retail.order");
        assert_eq!(envelope.event_type(), "retail.order.paid");
        assert_eq!(envelope.sequence_number(), 3);
        assert_eq!(envelope.occurred_at(), test_time());
        assert_eq!(envelope.into_payload(), 42);
    }
}
