//! Integration tests for the full lifecycle engine.
//!
//! Tests: Engine → CommandDispatcher → EventStore → EventBus / notices
//!
//! Verifies:
//! - Cross-aggregate workflows (Pro approval, reappro conversion)
//! - Exactly-once conversion, including a resumed one
//! - Optimistic concurrency conflicts are detected
//! - Tenant isolation is preserved

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::Value as JsonValue;

    use comptoir_accounts::{
        CompanyIdentity, ContactDetails, Customer, CustomerCommand, CustomerId, PartnershipType,
        ProRequestId, ProRequestStatus, ProStatus, RegisterCustomer, SuspendPro, UpdateProProfile,
    };
    use comptoir_core::{
        AggregateId, AggregateRoot, DiscountRate, ExpectedVersion, ProductId, TenantId, UserId,
    };
    use comptoir_events::{EventBus, EventEnvelope, InMemoryEventBus, StatusNotice, Subscription};
    use comptoir_pro::{
        OrderOrigin, PaymentStatus, PlaceProOrder, ProOrder, ProOrderCommand, ProOrderLineInput,
        ProOrderStatus, ProOrderType, RecordPayment, UpdateProOrderStatus,
    };
    use comptoir_reappro::{
        ApproveReapproRequest, DeliveryMethod, ItemApproval, Priority, ReapproLineInput,
        ReapproRequest, ReapproRequestCommand, ReapproStatus,
        SubmitReapproRequest, conversion_order_id,
    };
    use comptoir_retail::{
        MarkCollectedAndPaid, MarkReadyForPickup, PickupPoint, PlaceRetailOrder, RetailItem,
        RetailOrder, RetailOrderCommand, RetailOrderId, RetailOrderStatus, SetRetailStatus,
    };

    use crate::command_dispatcher::DispatchError;
    use crate::config::EngineConfig;
    use crate::engine::{CreateReapproInput, Engine, PlaceProOrderInput, SubmitProRequestInput};
    use crate::event_store::InMemoryEventStore;
    use crate::numbering::InMemoryDocumentNumbers;

    type EnvelopeBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type NoticeBus = Arc<InMemoryEventBus<StatusNotice>>;

    struct Harness {
        engine: Engine<InMemoryEventStore, EnvelopeBus, NoticeBus>,
        envelopes: Subscription<EventEnvelope<JsonValue>>,
        notices: Subscription<StatusNotice>,
        tenant_id: TenantId,
        admin: UserId,
    }

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn setup() -> Harness {
        let bus: EnvelopeBus = Arc::new(InMemoryEventBus::new());
        let notice_bus: NoticeBus = Arc::new(InMemoryEventBus::new());

        // Subscribe BEFORE any command runs so nothing is missed.
        let envelopes = bus.subscribe();
        let notices = notice_bus.subscribe();

        let engine = Engine::new(
            InMemoryEventStore::new(),
            bus,
            notice_bus,
            Arc::new(InMemoryDocumentNumbers::new()),
            EngineConfig::default(),
        );

        Harness {
            engine,
            envelopes,
            notices,
            tenant_id: test_tenant_id(),
            admin: UserId::new(),
        }
    }

    fn register_customer(h: &Harness) -> UserId {
        let user_id = UserId::new();
        h.engine
            .execute::<Customer>(CustomerCommand::Register(RegisterCustomer {
                tenant_id: h.tenant_id,
                customer_id: CustomerId::for_user(user_id),
                user_id,
                display_name: "Boutique du Port".to_string(),
                email: "contact@boutique-du-port.nc".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        user_id
    }

    fn request_input(h: &Harness, applicant: UserId, partnership: PartnershipType) -> SubmitProRequestInput {
        SubmitProRequestInput {
            tenant_id: h.tenant_id,
            applicant,
            company: CompanyIdentity {
                company_name: "Boutique du Port SARL".to_string(),
                ridet_number: "1234567.001".to_string(),
                legal_form: Some("SARL".to_string()),
                activity: None,
            },
            contact: ContactDetails {
                name: "Marie Wamytan".to_string(),
                email: "marie@boutique-du-port.nc".to_string(),
                phone: None,
                address: Some("12 rue du Quai, Nouméa".to_string()),
            },
            partnership_type: partnership,
            message: None,
            occurred_at: test_time(),
        }
    }

    fn submit_request(h: &Harness, applicant: UserId, partnership: PartnershipType) -> ProRequestId {
        let request = h
            .engine
            .submit_pro_request(request_input(h, applicant, partnership))
            .unwrap();
        request.id_typed()
    }

    /// Registered customer promoted to Pro at `rate` percent.
    fn pro_customer(h: &Harness, rate: u8, partnership: PartnershipType) -> UserId {
        let user_id = register_customer(h);
        let request_id = submit_request(h, user_id, partnership);
        h.engine
            .approve_pro_request(h.tenant_id, request_id, rate, None, h.admin, test_time())
            .unwrap();
        user_id
    }

    fn line(unit_price: u64, quantity: u32) -> ProOrderLineInput {
        ProOrderLineInput {
            product_id: ProductId::new(),
            name: "Savon au monoï".to_string(),
            quantity,
            unit_price,
        }
    }

    fn place_order(h: &Harness, customer: UserId, lines: Vec<ProOrderLineInput>) -> ProOrder {
        h.engine
            .place_pro_order(PlaceProOrderInput {
                tenant_id: h.tenant_id,
                customer_id: customer,
                order_type: ProOrderType::Reseller,
                lines,
                shipping_cost: 0,
                customer_notes: None,
                actor: customer,
                occurred_at: test_time(),
            })
            .unwrap()
    }

    /// Reappro request for `quantities` (unit price 1 000), submitted and pending.
    fn pending_reappro(h: &Harness, customer: UserId, quantities: &[u32]) -> ReapproRequest {
        let lines = quantities
            .iter()
            .map(|&q| ReapproLineInput {
                product_id: ProductId::new(),
                name: "Huile de coco".to_string(),
                requested_quantity: q,
                unit_price: 1_000,
                current_stock: 3,
                notes: None,
            })
            .collect();

        let request = h
            .engine
            .create_reappro_request(CreateReapproInput {
                tenant_id: h.tenant_id,
                customer_id: customer,
                lines,
                priority: Priority::Normal,
                requested_delivery_date: None,
                delivery_method: DeliveryMethod::Pickup,
                delivery_address: None,
                customer_notes: Some("Avant les fêtes".to_string()),
                occurred_at: test_time(),
            })
            .unwrap();

        h.engine
            .execute::<ReapproRequest>(ReapproRequestCommand::Submit(SubmitReapproRequest {
                tenant_id: h.tenant_id,
                request_id: request.id_typed(),
                actor: customer,
                occurred_at: test_time(),
            }))
            .unwrap()
    }

    fn approve_reappro(h: &Harness, request: &ReapproRequest, approved: &[u32]) -> ReapproRequest {
        let approvals = request
            .lines()
            .iter()
            .zip(approved)
            .map(|(l, &q)| ItemApproval {
                product_id: l.product_id,
                approved_quantity: q,
            })
            .collect();

        h.engine
            .execute::<ReapproRequest>(ReapproRequestCommand::Approve(ApproveReapproRequest {
                tenant_id: h.tenant_id,
                request_id: request.id_typed(),
                approvals,
                note: None,
                estimated_delivery_date: Some(test_time() + Duration::days(7)),
                actor: h.admin,
                occurred_at: test_time(),
            }))
            .unwrap()
    }

    fn placed_pro_orders(envelopes: &Subscription<EventEnvelope<JsonValue>>) -> usize {
        envelopes
            .drain()
            .iter()
            .filter(|e| e.event_type() == "pro.order.placed")
            .count()
    }

    #[test]
    fn approving_a_pro_request_promotes_the_customer() {
        let h = setup();
        let user_id = register_customer(&h);
        let request_id = submit_request(&h, user_id, PartnershipType::Reseller);

        let (request, customer) = h
            .engine
            .approve_pro_request(
                h.tenant_id,
                request_id,
                20,
                Some("Bon dossier".to_string()),
                h.admin,
                test_time(),
            )
            .unwrap();

        assert_eq!(request.status(), ProRequestStatus::Approved);
        assert!(customer.is_pro());
        assert_eq!(customer.pro_status(), ProStatus::Approved);
        let info = customer.pro_info().unwrap();
        assert_eq!(info.discount_rate, DiscountRate::new(20).unwrap());
        assert_eq!(info.company_name, "Boutique du Port SARL");
        assert_eq!(info.approved_at, Some(test_time()));

        let notices = h.notices.drain();
        assert!(notices.iter().any(|n| n.entity_type == "accounts.pro_request" && n.new_status == "approved"));
        assert!(notices.iter().any(|n| n.entity_type == "accounts.customer" && n.new_status == "approved"));
    }

    #[test]
    fn syncing_the_customer_tier_twice_is_a_no_op() {
        let h = setup();
        let user_id = register_customer(&h);
        let request_id = submit_request(&h, user_id, PartnershipType::Reseller);
        let (_, customer) = h
            .engine
            .approve_pro_request(h.tenant_id, request_id, 15, None, h.admin, test_time())
            .unwrap();

        let again = h
            .engine
            .sync_customer_tier(h.tenant_id, request_id, h.admin, test_time())
            .unwrap();
        assert_eq!(again.version(), customer.version());
    }

    #[test]
    fn out_of_range_discount_is_rejected_and_customer_untouched() {
        let h = setup();
        let user_id = register_customer(&h);
        let request_id = submit_request(&h, user_id, PartnershipType::Reseller);

        let err = h
            .engine
            .approve_pro_request(h.tenant_id, request_id, 150, None, h.admin, test_time())
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));

        let customer: Customer = h.engine.load(h.tenant_id, CustomerId::for_user(user_id).0).unwrap();
        assert!(!customer.is_pro());
        let request: comptoir_accounts::ProRequest = h.engine.load(h.tenant_id, request_id.0).unwrap();
        assert_eq!(request.status(), ProRequestStatus::Pending);
    }

    #[test]
    fn rejecting_a_pro_request_needs_a_reason_and_leaves_the_customer_alone() {
        use comptoir_accounts::{ProRequest, ProRequestCommand, RejectProRequest};

        let h = setup();
        let user_id = register_customer(&h);
        let request_id = submit_request(&h, user_id, PartnershipType::Consignment);
        let before: Customer = h.engine.load(h.tenant_id, CustomerId::for_user(user_id).0).unwrap();

        let reject = |reason: &str| {
            h.engine.execute::<ProRequest>(ProRequestCommand::Reject(RejectProRequest {
                tenant_id: h.tenant_id,
                request_id,
                reason: reason.to_string(),
                actor: h.admin,
                occurred_at: test_time(),
            }))
        };

        assert!(matches!(reject("   ").unwrap_err(), DispatchError::Validation(_)));

        let request = reject("RIDET introuvable").unwrap();
        assert_eq!(request.status(), ProRequestStatus::Rejected);
        assert_eq!(request.rejection_reason(), Some("RIDET introuvable"));

        let after: Customer = h.engine.load(h.tenant_id, CustomerId::for_user(user_id).0).unwrap();
        assert_eq!(after, before);

        let rejection = h
            .notices
            .drain()
            .into_iter()
            .find(|n| n.new_status == "rejected")
            .unwrap();
        assert_eq!(rejection.entity_id, request_id.0);
        assert_eq!(rejection.note.as_deref(), Some("RIDET introuvable"));
    }

    #[test]
    fn unregistered_applicants_cannot_apply() {
        let h = setup();

        let err = h
            .engine
            .submit_pro_request(request_input(&h, UserId::new(), PartnershipType::Reseller))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
        assert!(h.envelopes.drain().is_empty());
    }

    #[test]
    fn suspended_pros_must_be_reinstated_instead_of_reapplying() {
        let h = setup();
        let user_id = pro_customer(&h, 10, PartnershipType::Reseller);
        h.engine
            .execute::<Customer>(CustomerCommand::SuspendPro(SuspendPro {
                tenant_id: h.tenant_id,
                customer_id: CustomerId::for_user(user_id),
                reason: "Impayés".to_string(),
                actor: h.admin,
                occurred_at: test_time(),
            }))
            .unwrap();

        let err = h
            .engine
            .submit_pro_request(request_input(&h, user_id, PartnershipType::Reseller))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition(_)));
    }

    #[test]
    fn approval_is_refused_before_commit_when_the_applicant_is_suspended() {
        use comptoir_accounts::ProRequest;

        let h = setup();
        let user_id = register_customer(&h);
        let request_id = submit_request(&h, user_id, PartnershipType::Reseller);

        // Suspended by an administrator while the request was pending.
        h.engine
            .execute::<Customer>(CustomerCommand::UpdateProProfile(UpdateProProfile {
                tenant_id: h.tenant_id,
                customer_id: CustomerId::for_user(user_id),
                pro_status: ProStatus::Suspended,
                pro_info: None,
                actor: h.admin,
                occurred_at: test_time(),
            }))
            .unwrap();
        let before: Customer = h.engine.load(h.tenant_id, CustomerId::for_user(user_id).0).unwrap();

        let err = h
            .engine
            .approve_pro_request(h.tenant_id, request_id, 20, None, h.admin, test_time())
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition(_)));

        let request: ProRequest = h.engine.load(h.tenant_id, request_id.0).unwrap();
        assert_eq!(request.status(), ProRequestStatus::Pending);
        assert_eq!(request.version(), 1);
        let after: Customer = h.engine.load(h.tenant_id, CustomerId::for_user(user_id).0).unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn approval_is_refused_when_another_request_already_made_the_applicant_pro() {
        use comptoir_accounts::ProRequest;

        let h = setup();
        let user_id = register_customer(&h);
        let first = submit_request(&h, user_id, PartnershipType::Reseller);
        let second = submit_request(&h, user_id, PartnershipType::Consignment);
        h.engine
            .approve_pro_request(h.tenant_id, first, 10, None, h.admin, test_time())
            .unwrap();

        let err = h
            .engine
            .approve_pro_request(h.tenant_id, second, 25, None, h.admin, test_time())
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition(_)));

        let request: ProRequest = h.engine.load(h.tenant_id, second.0).unwrap();
        assert_eq!(request.status(), ProRequestStatus::Pending);
    }

    #[test]
    fn retail_order_totals_survive_the_pickup_flow_and_delete_is_unconditional() {
        let h = setup();
        let order_id = RetailOrderId::new(AggregateId::new());
        let customer = UserId::new();

        let placed = h
            .engine
            .execute::<RetailOrder>(RetailOrderCommand::PlaceRetailOrder(PlaceRetailOrder {
                tenant_id: h.tenant_id,
                order_id,
                customer_id: customer,
                items: vec![RetailItem {
                    product_id: ProductId::new(),
                    name: "Pareo".to_string(),
                    unit_price: 5_000,
                    quantity: 2,
                    variant: None,
                }],
                pickup: PickupPoint {
                    name: "Atelier".to_string(),
                    address: "3 rue Jean Jaurès".to_string(),
                },
                tax_price: 300,
                shipping_price: 0,
                notes: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(placed.total_price(), 10_300);

        for status in [RetailOrderStatus::Confirmed, RetailOrderStatus::Preparing] {
            h.engine
                .execute::<RetailOrder>(RetailOrderCommand::SetStatus(SetRetailStatus {
                    tenant_id: h.tenant_id,
                    order_id,
                    status,
                    occurred_at: test_time(),
                }))
                .unwrap();
        }
        let ready = h
            .engine
            .execute::<RetailOrder>(RetailOrderCommand::MarkReadyForPickup(MarkReadyForPickup {
                tenant_id: h.tenant_id,
                order_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(ready.status(), RetailOrderStatus::ReadyForPickup);

        let collected = h
            .engine
            .execute::<RetailOrder>(RetailOrderCommand::MarkCollectedAndPaid(MarkCollectedAndPaid {
                tenant_id: h.tenant_id,
                order_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(collected.status(), RetailOrderStatus::Collected);
        assert!(collected.is_paid());
        assert_eq!(collected.total_price(), 10_300);

        // Paid and collected orders can still be deleted.
        h.engine.delete_retail_order(h.tenant_id, order_id).unwrap();
        let err = h.engine.load::<RetailOrder>(h.tenant_id, order_id.0).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
        let err = h.engine.delete_retail_order(h.tenant_id, order_id).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
    }

    #[test]
    fn pro_order_partial_payments_settle_the_balance() {
        let h = setup();
        let customer = pro_customer(&h, 0, PartnershipType::Reseller);
        let order = place_order(&h, customer, vec![line(100_000, 1)]);
        assert_eq!(order.total_amount(), 100_000);
        assert_eq!(order.status(), ProOrderStatus::Draft);
        assert_eq!(order.order_number(), "CMD-2026-00001");
        assert_eq!(order.payment_due_date(), Some(test_time() + Duration::days(30)));

        let pay = |amount: u64| {
            h.engine.execute::<ProOrder>(ProOrderCommand::RecordPayment(RecordPayment {
                tenant_id: h.tenant_id,
                order_id: order.id_typed(),
                amount,
                note: None,
                actor: h.admin,
                occurred_at: test_time(),
            }))
        };

        let order = pay(60_000).unwrap();
        assert_eq!(order.payment_status(test_time()), PaymentStatus::Partial);

        assert!(matches!(pay(50_000).unwrap_err(), DispatchError::Validation(_)));

        let order = pay(40_000).unwrap();
        assert_eq!(order.paid_amount(), 100_000);
        assert_eq!(order.payment_status(test_time()), PaymentStatus::Paid);
    }

    #[test]
    fn pro_order_uses_the_customer_discount() {
        let h = setup();
        let customer = pro_customer(&h, 15, PartnershipType::Reseller);
        let order = place_order(&h, customer, vec![line(2_000, 5)]);

        assert_eq!(order.subtotal(), 10_000);
        assert_eq!(order.discount_amount(), 1_500);
        assert_eq!(order.total_amount(), 8_500);
        assert_eq!(order.origin(), &OrderOrigin::Direct);
    }

    #[test]
    fn stale_expected_version_is_a_conflict() {
        let h = setup();
        let customer = pro_customer(&h, 0, PartnershipType::Reseller);
        let order = place_order(&h, customer, vec![line(1_000, 1)]);
        let seen = order.version();

        let update = |status: ProOrderStatus| {
            h.engine.execute_expecting::<ProOrder>(
                ProOrderCommand::UpdateStatus(UpdateProOrderStatus {
                    tenant_id: h.tenant_id,
                    order_id: order.id_typed(),
                    status,
                    note: None,
                    actor: h.admin,
                    occurred_at: test_time(),
                }),
                ExpectedVersion::Exact(seen),
            )
        };

        update(ProOrderStatus::Confirmed).unwrap();
        let err = update(ProOrderStatus::Cancelled).unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));

        let current: ProOrder = h.engine.load(h.tenant_id, order.id_typed().0).unwrap();
        assert_eq!(current.status(), ProOrderStatus::Confirmed);
    }

    #[test]
    fn invoice_numbers_are_assigned_once() {
        let h = setup();
        let customer = pro_customer(&h, 0, PartnershipType::Reseller);
        let first = place_order(&h, customer, vec![line(1_000, 1)]);
        let second = place_order(&h, customer, vec![line(1_000, 2)]);

        let number = h
            .engine
            .generate_invoice_number(h.tenant_id, first.id_typed(), h.admin, test_time())
            .unwrap();
        assert_eq!(number, "FAC-2026-00001");

        let again = h
            .engine
            .generate_invoice_number(h.tenant_id, first.id_typed(), h.admin, test_time())
            .unwrap();
        assert_eq!(again, number);

        // The retry above did not consume a sequence value.
        let other = h
            .engine
            .generate_invoice_number(h.tenant_id, second.id_typed(), h.admin, test_time())
            .unwrap();
        assert_eq!(other, "FAC-2026-00002");
    }

    #[test]
    fn non_pro_customers_cannot_order_or_request_replenishment() {
        let h = setup();
        let customer = register_customer(&h);

        let err = h
            .engine
            .place_pro_order(PlaceProOrderInput {
                tenant_id: h.tenant_id,
                customer_id: customer,
                order_type: ProOrderType::Reseller,
                lines: vec![line(1_000, 1)],
                shipping_cost: 0,
                customer_notes: None,
                actor: customer,
                occurred_at: test_time(),
            })
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unauthorized));

        let err = h
            .engine
            .create_reappro_request(CreateReapproInput {
                tenant_id: h.tenant_id,
                customer_id: customer,
                lines: vec![],
                priority: Priority::Normal,
                requested_delivery_date: None,
                delivery_method: DeliveryMethod::Pickup,
                delivery_address: None,
                customer_notes: None,
                occurred_at: test_time(),
            })
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unauthorized));
    }

    #[test]
    fn partial_reappro_converts_into_one_order_line() {
        let h = setup();
        let customer = pro_customer(&h, 10, PartnershipType::Consignment);
        let request = pending_reappro(&h, customer, &[10, 5]);
        assert_eq!(request.request_number(), "REA-2026-00001");

        let request = approve_reappro(&h, &request, &[10, 0]);
        assert_eq!(request.status(), ReapproStatus::Partial);

        let order = h
            .engine
            .convert_reappro_to_order(h.tenant_id, request.id_typed(), h.admin, test_time())
            .unwrap();

        assert_eq!(order.id_typed(), conversion_order_id(request.id_typed()));
        assert_eq!(order.status(), ProOrderStatus::Draft);
        assert_eq!(order.order_type(), ProOrderType::Consignment);
        assert_eq!(order.lines().len(), 1);
        assert_eq!(order.lines()[0].quantity, 10);
        assert_eq!(order.lines()[0].unit_price, 1_000);
        assert_eq!(order.subtotal(), 10_000);
        assert_eq!(order.discount_amount(), 1_000);
        assert_eq!(order.total_amount(), 9_000);
        assert!(matches!(order.origin(), OrderOrigin::Reappro { request_id, .. } if *request_id == request.id_typed().0));

        let request: ReapproRequest = h.engine.load(h.tenant_id, request.id_typed().0).unwrap();
        assert_eq!(request.generated_order(), Some(order.id_typed().0));
    }

    #[test]
    fn converting_twice_is_a_conflict_and_creates_one_order() {
        let h = setup();
        let customer = pro_customer(&h, 0, PartnershipType::Reseller);
        let request = pending_reappro(&h, customer, &[4, 2]);
        let request = approve_reappro(&h, &request, &[4, 2]);
        assert_eq!(request.status(), ReapproStatus::Approved);
        h.envelopes.drain();

        h.engine
            .convert_reappro_to_order(h.tenant_id, request.id_typed(), h.admin, test_time())
            .unwrap();
        let err = h
            .engine
            .convert_reappro_to_order(h.tenant_id, request.id_typed(), h.admin, test_time())
            .unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));

        assert_eq!(placed_pro_orders(&h.envelopes), 1);
    }

    #[test]
    fn interrupted_conversion_resumes_with_the_existing_order() {
        let h = setup();
        let customer = pro_customer(&h, 0, PartnershipType::Reseller);
        let request = pending_reappro(&h, customer, &[3]);
        let request = approve_reappro(&h, &request, &[3]);
        let plan = request.conversion_plan().unwrap();

        // First attempt died after the order was written, before the link.
        let orphan = h
            .engine
            .execute::<ProOrder>(ProOrderCommand::PlaceProOrder(PlaceProOrder {
                tenant_id: h.tenant_id,
                order_id: plan.order_id,
                order_number: "CMD-2026-00042".to_string(),
                customer_id: plan.customer_id,
                order_type: plan.order_type,
                lines: plan.lines.clone(),
                discount_rate: DiscountRate::zero(),
                shipping_cost: 0,
                payment_due_date: None,
                customer_notes: None,
                origin: plan.origin.clone(),
                placed_by: h.admin,
                occurred_at: test_time(),
            }))
            .unwrap();
        h.envelopes.drain();

        let order = h
            .engine
            .convert_reappro_to_order(h.tenant_id, request.id_typed(), h.admin, test_time())
            .unwrap();
        assert_eq!(order.id_typed(), orphan.id_typed());
        assert_eq!(order.order_number(), "CMD-2026-00042");
        assert_eq!(placed_pro_orders(&h.envelopes), 0);

        let request: ReapproRequest = h.engine.load(h.tenant_id, request.id_typed().0).unwrap();
        assert_eq!(request.generated_order(), Some(orphan.id_typed().0));
    }

    #[test]
    fn pending_reappro_cannot_be_converted() {
        let h = setup();
        let customer = pro_customer(&h, 0, PartnershipType::Reseller);
        let request = pending_reappro(&h, customer, &[1]);

        let err = h
            .engine
            .convert_reappro_to_order(h.tenant_id, request.id_typed(), h.admin, test_time())
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition(_)));
    }

    #[test]
    fn streams_are_invisible_to_other_tenants() {
        let h = setup();
        let customer = pro_customer(&h, 0, PartnershipType::Reseller);
        let request = pending_reappro(&h, customer, &[2]);

        let other_tenant = test_tenant_id();
        let err = h
            .engine
            .load::<ReapproRequest>(other_tenant, request.id_typed().0)
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));

        let err = h
            .engine
            .convert_reappro_to_order(other_tenant, request.id_typed(), h.admin, test_time())
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
    }

    #[test]
    fn committed_events_are_published_with_their_stream_metadata() {
        let h = setup();
        let user_id = register_customer(&h);

        let envelopes = h.envelopes.drain();
        assert_eq!(envelopes.len(), 1);
        let env = &envelopes[0];
        assert_eq!(env.tenant_id(), h.tenant_id);
        assert_eq!(env.aggregate_id(), CustomerId::for_user(user_id).0);
        assert_eq!(env.aggregate_type(), "accounts.customer");
        assert_eq!(env.sequence_number(), 1);
        assert_eq!(env.event_type(), "accounts.customer.registered");
        assert_eq!(env.occurred_at(), test_time());

        // Registration is not a status change.
        assert!(h.notices.drain().is_empty());
    }

    #[derive(Debug)]
    struct NoticeOutage;

    /// Notice bus whose every publish fails.
    struct FailingNotices;

    impl EventBus<StatusNotice> for FailingNotices {
        type Error = NoticeOutage;

        fn publish(&self, _message: StatusNotice) -> Result<(), Self::Error> {
            Err(NoticeOutage)
        }

        fn subscribe(&self) -> Subscription<StatusNotice> {
            Subscription::new(std::sync::mpsc::channel().1)
        }
    }

    #[test]
    fn a_failed_notice_does_not_fail_the_committed_command() {
        let bus: EnvelopeBus = Arc::new(InMemoryEventBus::new());
        let envelopes = bus.subscribe();
        let engine = Engine::new(
            InMemoryEventStore::new(),
            bus,
            FailingNotices,
            Arc::new(InMemoryDocumentNumbers::new()),
            EngineConfig::default(),
        );
        let tenant_id = test_tenant_id();
        let order_id = RetailOrderId::new(AggregateId::new());

        let placed = engine
            .execute::<RetailOrder>(RetailOrderCommand::PlaceRetailOrder(PlaceRetailOrder {
                tenant_id,
                order_id,
                customer_id: UserId::new(),
                items: vec![RetailItem {
                    product_id: ProductId::new(),
                    name: "Tifaifai".to_string(),
                    unit_price: 12_000,
                    quantity: 1,
                    variant: None,
                }],
                pickup: PickupPoint {
                    name: "Atelier".to_string(),
                    address: "3 rue Jean Jaurès".to_string(),
                },
                tax_price: 0,
                shipping_price: 0,
                notes: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(placed.status(), RetailOrderStatus::Pending);

        let stored: RetailOrder = engine.load(tenant_id, order_id.0).unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(envelopes.drain().len(), 1);
    }
}
