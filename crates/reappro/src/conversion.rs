//! Turning an approved reappro request into a Pro order.

use comptoir_accounts::PartnershipType;
use comptoir_core::{AggregateId, DomainError, UserId};
use comptoir_pro::{OrderOrigin, ProOrderId, ProOrderLineInput, ProOrderType};

use crate::request::{ReapproRequest, ReapproRequestId};

const CONVERSION_PURPOSE: &str = "reappro.conversion";

/// Id of the Pro order generated from a request.
///
/// Stable across retries, so a conversion interrupted after the order was
/// created finds that order again instead of creating a second one.
pub fn conversion_order_id(request_id: ReapproRequestId) -> ProOrderId {
    ProOrderId::new(AggregateId::derived_from(request_id.0, CONVERSION_PURPOSE))
}

/// Everything the order side needs that comes from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    pub order_id: ProOrderId,
    pub customer_id: UserId,
    pub order_type: ProOrderType,
    /// Lines with a positive approved quantity, at the request's unit price.
    pub lines: Vec<ProOrderLineInput>,
    pub customer_notes: Option<String>,
    pub origin: OrderOrigin,
}

impl ReapproRequest {
    pub fn conversion_plan(&self) -> Result<ConversionPlan, DomainError> {
        self.ensure_convertible()?;

        let customer_id = self
            .customer_id()
            .ok_or_else(|| DomainError::invariant("reappro request has no customer"))?;

        let lines: Vec<ProOrderLineInput> = self
            .lines()
            .iter()
            .filter(|l| l.approved_quantity > 0)
            .map(|l| ProOrderLineInput {
                product_id: l.product_id,
                name: l.name.clone(),
                quantity: l.approved_quantity,
                unit_price: l.unit_price,
            })
            .collect();

        if lines.is_empty() {
            return Err(DomainError::invariant(
                "convertible reappro request has no approved lines",
            ));
        }

        let order_type = match self.partnership_type() {
            PartnershipType::Consignment => ProOrderType::Consignment,
            PartnershipType::Reseller | PartnershipType::Distributor => ProOrderType::Reseller,
        };

        Ok(ConversionPlan {
            order_id: conversion_order_id(self.id_typed()),
            customer_id,
            order_type,
            lines,
            customer_notes: self.customer_notes().map(str::to_string),
            origin: OrderOrigin::Reappro {
                request_id: self.id_typed().0,
                request_number: self.request_number().to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::{approve_cmd, pending_request};
    use comptoir_events::execute;

    #[test]
    fn plan_keeps_only_approved_lines_at_snapshot_price() {
        let mut f = pending_request(&[10, 5]);
        let cmd = approve_cmd(&f, &[10, 0]);
        execute(&mut f.request, &cmd).unwrap();

        let plan = f.request.conversion_plan().unwrap();
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].quantity, 10);
        assert_eq!(plan.lines[0].unit_price, 1_000);
        assert_eq!(plan.lines[0].product_id, f.request.lines()[0].product_id);
        assert_eq!(plan.customer_id, f.customer_id);
        assert_eq!(plan.order_id, conversion_order_id(f.request_id));
        assert!(matches!(plan.origin, OrderOrigin::Reappro { request_id, .. } if request_id == f.request_id.0));
    }

    #[test]
    fn pending_requests_have_no_plan() {
        let f = pending_request(&[1]);
        let err = f.request.conversion_plan().unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn conversion_id_differs_from_request_id() {
        let id = ReapproRequestId::new(AggregateId::new());
        assert_eq!(conversion_order_id(id), conversion_order_id(id));
        assert_ne!(conversion_order_id(id).0, id.0);
    }
}
