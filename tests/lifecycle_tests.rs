//! End-to-end lifecycle tests driving the public API the way an
//! embedding application would: directory and balances seeded up
//! front, then full transaction, escrow, dispute, and marketplace
//! flows against a single engine.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use p2p_settlement_engine::gateway::{
    AccountStatus, CustomerProfile, InMemoryBalances, InMemoryDirectory, RecordingDispatcher,
};
use p2p_settlement_engine::types::{ItemCondition, NotificationKind, ShippingOption};
use p2p_settlement_engine::{
    Actor, CustomerId, DisputePriority, DisputeReason, DisputeStatus, EngineConfig, EngineError,
    EvidenceKind, ItemFilter, ItemListing, ItemStatus, ResolutionDecision, SettlementEngine,
    TransactionId, TransactionRequest, TransactionStatus, TransactionType,
};

const ALICE: CustomerId = 1;
const BOB: CustomerId = 2;
const CAROL: CustomerId = 3;
const ARBITER: CustomerId = 100;

struct Fixture {
    engine: SettlementEngine,
    balances: Arc<InMemoryBalances>,
    notifier: Arc<RecordingDispatcher>,
}

fn fixture() -> Fixture {
    let directory = Arc::new(InMemoryDirectory::new());
    let balances = Arc::new(InMemoryBalances::new());
    let notifier = Arc::new(RecordingDispatcher::new());

    for customer in [ALICE, BOB, CAROL] {
        directory.upsert(CustomerProfile {
            customer,
            account_status: AccountStatus::Active,
            registered_at: Utc::now() - Duration::days(365),
            risk_score: Some(25),
        });
        balances.set(customer, Decimal::from(50_000));
    }

    Fixture {
        engine: SettlementEngine::new(
            directory,
            balances.clone(),
            notifier.clone(),
            EngineConfig::default(),
        ),
        balances,
        notifier,
    }
}

fn transfer(sender: CustomerId, receiver: CustomerId, amount: i64) -> TransactionRequest {
    TransactionRequest {
        sender,
        receiver,
        amount: Decimal::from(amount),
        fee: Decimal::ZERO,
        currency: "USD".to_string(),
        tx_type: TransactionType::DirectTransfer,
        description: "transfer".to_string(),
        marketplace: None,
        service: None,
        loan: None,
        external_reference: None,
    }
}

fn complete(engine: &SettlementEngine, id: TransactionId) {
    engine.begin_processing(id).unwrap();
    engine.complete_transaction(id).unwrap();
}

#[test]
fn transfer_settles_end_to_end() {
    let f = fixture();

    let transaction = f.engine.create_transaction(transfer(ALICE, BOB, 250)).unwrap();
    assert_eq!(transaction.status, TransactionStatus::Pending);
    assert_eq!(transaction.net_amount, Decimal::from(250));
    assert!(!transaction.risk.flagged);

    complete(&f.engine, transaction.id);

    let settled = f.engine.get_transaction(transaction.id).unwrap();
    assert_eq!(settled.status, TransactionStatus::Completed);
    assert!(settled.completed_at.is_some());
    assert_eq!(settled.audit_trail.first().unwrap().action, "transaction_created");
    assert_eq!(settled.audit_trail.last().unwrap().action, "transaction_completed");

    // Both parties were told about the creation.
    let created = f
        .notifier
        .sent()
        .iter()
        .filter(|(_, kind, _)| *kind == NotificationKind::TransactionCreated)
        .count();
    assert_eq!(created, 2);
}

#[test]
fn dispute_with_full_refund() {
    let f = fixture();
    let id = f.engine.create_transaction(transfer(ALICE, BOB, 300)).unwrap().id;
    complete(&f.engine, id);

    let dispute = f
        .engine
        .create_dispute(id, ALICE, DisputeReason::ItemNotReceived, "never arrived")
        .unwrap();
    assert_eq!(dispute.respondent, BOB);
    assert_eq!(
        f.engine.get_transaction(id).unwrap().status,
        TransactionStatus::Disputed
    );

    f.engine.begin_dispute_review(dispute.id).unwrap();
    f.engine
        .add_dispute_evidence(dispute.id, ALICE, EvidenceKind::Image, "tracking page")
        .unwrap();
    f.engine
        .post_dispute_message(dispute.id, Actor::Customer(BOB), "courier lost it", false)
        .unwrap();

    let resolved = f
        .engine
        .resolve_dispute(
            dispute.id,
            ResolutionDecision::RefundFull,
            None,
            "carrier confirmed loss",
            ARBITER,
        )
        .unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert_eq!(
        resolved.resolution.unwrap().refund_amount,
        Some(Decimal::from(300))
    );

    let refunded = f.engine.get_transaction(id).unwrap();
    assert_eq!(refunded.status, TransactionStatus::Refunded);
    assert_eq!(refunded.dispute.unwrap().refund_amount, Some(Decimal::from(300)));
}

#[test]
fn dispute_without_refund_restores_completion() {
    let f = fixture();
    let id = f.engine.create_transaction(transfer(ALICE, BOB, 80)).unwrap().id;
    complete(&f.engine, id);

    let dispute = f
        .engine
        .create_dispute(id, ALICE, DisputeReason::Other, "changed my mind")
        .unwrap();
    assert_eq!(dispute.priority, DisputePriority::Low);

    f.engine
        .resolve_dispute(
            dispute.id,
            ResolutionDecision::NoRefund,
            None,
            "buyer remorse is not grounds",
            ARBITER,
        )
        .unwrap();

    assert_eq!(
        f.engine.get_transaction(id).unwrap().status,
        TransactionStatus::Completed
    );
}

#[test]
fn partial_refund_moves_exact_amount() {
    let f = fixture();
    let id = f.engine.create_transaction(transfer(ALICE, BOB, 200)).unwrap().id;
    complete(&f.engine, id);

    let dispute = f
        .engine
        .create_dispute(id, ALICE, DisputeReason::ItemNotAsDescribed, "missing parts")
        .unwrap();

    f.engine
        .resolve_dispute(
            dispute.id,
            ResolutionDecision::RefundPartial,
            Some(Decimal::from(50)),
            "partial compensation for missing parts",
            ARBITER,
        )
        .unwrap();

    let refunded = f.engine.get_transaction(id).unwrap();
    assert_eq!(refunded.status, TransactionStatus::Refunded);
    assert_eq!(refunded.dispute.unwrap().refund_amount, Some(Decimal::from(50)));
}

#[test]
fn high_value_missing_payment_is_urgent() {
    let f = fixture();
    let id = f.engine.create_transaction(transfer(ALICE, BOB, 1_200)).unwrap().id;
    complete(&f.engine, id);

    let dispute = f
        .engine
        .create_dispute(id, BOB, DisputeReason::PaymentNotReceived, "no funds landed")
        .unwrap();
    assert_eq!(dispute.priority, DisputePriority::Urgent);
}

#[test]
fn escrow_deal_releases_manually_and_lazily() {
    let f = fixture();

    let mut request = transfer(ALICE, BOB, 900);
    request.tx_type = TransactionType::EscrowDeal;
    let manual = f.engine.create_transaction(request.clone()).unwrap();
    assert!(manual.escrow.is_some());

    // Release before processing is a state error.
    assert!(matches!(
        f.engine
            .release_escrow_funds(manual.id, Actor::Customer(ALICE), "too early")
            .unwrap_err(),
        EngineError::EscrowNotReleasable { .. }
    ));

    f.engine.begin_processing(manual.id).unwrap();
    let released = f
        .engine
        .release_escrow_funds(manual.id, Actor::Customer(ALICE), "deal completed")
        .unwrap();
    assert_eq!(released.status, TransactionStatus::Completed);

    // A second escrow deal is left to the lazy sweep.
    let lazy = f.engine.create_transaction(request).unwrap();
    f.engine.begin_processing(lazy.id).unwrap();
    assert!(f.engine.release_due_escrows(Utc::now()).is_empty());

    let swept = f.engine.release_due_escrows(Utc::now() + Duration::days(8));
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].id, lazy.id);
    assert_eq!(
        f.engine.get_transaction(lazy.id).unwrap().status,
        TransactionStatus::Completed
    );
}

#[test]
fn marketplace_sale_from_listing_to_buyer_release() {
    let f = fixture();

    let item = f
        .engine
        .create_marketplace_item(ItemListing {
            seller: BOB,
            title: "Film camera".to_string(),
            description: "Fully serviced".to_string(),
            category: "photography".to_string(),
            price: Decimal::from(100),
            currency: "USD".to_string(),
            condition: ItemCondition::Good,
            images: vec!["front.jpg".to_string()],
            shipping: vec![ShippingOption {
                method: "tracked".to_string(),
                cost: Decimal::new(799, 2),
            }],
        })
        .unwrap();

    let sale = f.engine.process_marketplace_purchase(item.id, ALICE).unwrap();
    assert_eq!(sale.fee, Decimal::new(500, 2));
    assert_eq!(sale.net_amount, Decimal::new(9500, 2));
    assert!(sale.escrow.as_ref().unwrap().manual_release_required);
    assert!(sale.marketplace.as_ref().unwrap().shipping_required);

    let sold = f.engine.get_marketplace_item(item.id).unwrap();
    assert_eq!(sold.status, ItemStatus::Sold);
    assert_eq!(sold.buyer, Some(ALICE));

    // Second buyer loses the race.
    assert!(matches!(
        f.engine.process_marketplace_purchase(item.id, CAROL).unwrap_err(),
        EngineError::ItemNotPurchasable { .. }
    ));

    // Manual-release sales never auto-release.
    f.engine.begin_processing(sale.id).unwrap();
    assert!(f
        .engine
        .release_due_escrows(Utc::now() + Duration::days(30))
        .is_empty());

    // The buyer confirms receipt and funds go to the seller.
    let released = f
        .engine
        .release_escrow_funds(sale.id, Actor::Customer(ALICE), "item received")
        .unwrap();
    assert_eq!(released.status, TransactionStatus::Completed);
    assert!(f
        .notifier
        .sent()
        .iter()
        .any(|(to, kind, _)| *to == BOB && *kind == NotificationKind::PaymentReceived));
}

#[test]
fn underfunded_purchase_leaves_item_for_the_next_buyer() {
    let f = fixture();
    let item = f
        .engine
        .create_marketplace_item(ItemListing {
            seller: BOB,
            title: "Desk lamp".to_string(),
            description: "Warm light".to_string(),
            category: "home".to_string(),
            price: Decimal::from(60),
            currency: "USD".to_string(),
            condition: ItemCondition::New,
            images: vec![],
            shipping: vec![],
        })
        .unwrap();

    f.balances.set(ALICE, Decimal::from(10));
    assert!(matches!(
        f.engine.process_marketplace_purchase(item.id, ALICE).unwrap_err(),
        EngineError::InsufficientBalance { .. }
    ));
    assert_eq!(
        f.engine.get_marketplace_item(item.id).unwrap().status,
        ItemStatus::Active
    );

    let sale = f.engine.process_marketplace_purchase(item.id, CAROL).unwrap();
    assert_eq!(sale.sender, CAROL);
    assert!(!sale.marketplace.unwrap().shipping_required);
}

#[test]
fn creation_guards_reject_bad_requests() {
    let f = fixture();

    assert!(matches!(
        f.engine.create_transaction(transfer(ALICE, ALICE, 10)).unwrap_err(),
        EngineError::SelfTransfer { .. }
    ));

    f.balances.set(ALICE, Decimal::from(5));
    assert!(matches!(
        f.engine.create_transaction(transfer(ALICE, BOB, 10)).unwrap_err(),
        EngineError::InsufficientBalance { .. }
    ));

    // Nothing was written on either rejection.
    assert!(f.engine.get_customer_transactions(ALICE).is_empty());
}

#[test]
fn risk_assessment_flags_new_accounts_and_large_amounts() {
    let directory = Arc::new(InMemoryDirectory::new());
    let balances = Arc::new(InMemoryBalances::new());
    directory.upsert(CustomerProfile {
        customer: ALICE,
        account_status: AccountStatus::Active,
        registered_at: Utc::now() - Duration::days(5),
        risk_score: Some(90),
    });
    directory.upsert(CustomerProfile {
        customer: BOB,
        account_status: AccountStatus::Active,
        registered_at: Utc::now() - Duration::days(10),
        risk_score: Some(90),
    });
    balances.set(ALICE, Decimal::from(100_000));

    let engine = SettlementEngine::new(
        directory,
        balances,
        Arc::new(RecordingDispatcher::new()),
        EngineConfig::default(),
    );

    let transaction = engine.create_transaction(transfer(ALICE, BOB, 6_000)).unwrap();
    assert!(transaction.risk.flagged);
    assert_eq!(transaction.risk.sender_score, 105); // 90 + new-account penalty
    assert_eq!(transaction.risk.transaction_score, 20);

    // Same inputs, same assessment.
    let again = engine.create_transaction(transfer(ALICE, BOB, 6_000)).unwrap();
    assert_eq!(again.risk.flags, transaction.risk.flags);
}

#[test]
fn statistics_reflect_ledger_and_disputes() {
    let f = fixture();

    let settled = f.engine.create_transaction(transfer(ALICE, BOB, 100)).unwrap().id;
    complete(&f.engine, settled);
    let disputed = f.engine.create_transaction(transfer(ALICE, BOB, 400)).unwrap().id;
    complete(&f.engine, disputed);
    f.engine.create_transaction(transfer(CAROL, BOB, 25)).unwrap();

    let open = f
        .engine
        .create_dispute(disputed, ALICE, DisputeReason::Other, "under discussion")
        .unwrap();
    let stats = f.engine.statistics();
    assert_eq!(stats.total_transactions, 3);
    assert_eq!(stats.total_volume, Decimal::from(525));
    assert_eq!(stats.total_disputes, 1);
    assert_eq!(stats.dispute_resolution_rate, 0.0);

    f.engine
        .resolve_dispute(open.id, ResolutionDecision::NoRefund, None, "settled amicably", ARBITER)
        .unwrap();
    let stats = f.engine.statistics();
    assert_eq!(stats.resolved_disputes, 1);
    assert_eq!(stats.dispute_resolution_rate, 1.0);
    assert_eq!(stats.status_counts[&TransactionStatus::Completed], 2);
    assert_eq!(stats.status_counts[&TransactionStatus::Pending], 1);
}

#[test]
fn customer_views_span_transactions_disputes_and_listings() {
    let f = fixture();
    let first = f.engine.create_transaction(transfer(ALICE, BOB, 10)).unwrap().id;
    let second = f.engine.create_transaction(transfer(BOB, ALICE, 20)).unwrap().id;
    complete(&f.engine, second);
    let dispute = f
        .engine
        .create_dispute(second, ALICE, DisputeReason::Other, "query")
        .unwrap();

    let transactions = f.engine.get_customer_transactions(ALICE);
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].id, second);
    assert_eq!(transactions[1].id, first);

    let disputes = f.engine.get_customer_disputes(BOB);
    assert_eq!(disputes.len(), 1);
    assert_eq!(disputes[0].id, dispute.id);

    assert!(f
        .engine
        .get_marketplace_items(&ItemFilter {
            seller: Some(ALICE),
            ..Default::default()
        })
        .is_empty());
}
