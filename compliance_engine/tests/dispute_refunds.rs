//! Dispute resolution and refund orchestration: the buyer is made whole first, recovery from the
//! seller is best-effort, and every shortfall lands on the seller's debt ledger.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{Duration, Utc};
use compliance_engine::{
    db_types::*,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{ComplianceLedger, DebtManagement, DisputeManagement, LedgerError, SellerAccounts},
    DisputeApi,
    OrderFlowApi,
    ProviderClient,
    ProviderError,
    SqliteDatabase,
};

/// Stub provider. `recoverable` caps what `recover_from_seller` will pull; `fail_refunds` makes
/// buyer refunds bounce until flipped off.
#[derive(Clone)]
struct TestProvider {
    recoverable: Money,
    fail_refunds: Arc<AtomicBool>,
}

impl TestProvider {
    fn new(recoverable_units: i64) -> Self {
        Self { recoverable: Money::from_units(recoverable_units), fail_refunds: Arc::new(AtomicBool::new(false)) }
    }

    fn failing(recoverable_units: i64) -> Self {
        let provider = Self::new(recoverable_units);
        provider.fail_refunds.store(true, Ordering::SeqCst);
        provider
    }
}

impl ProviderClient for TestProvider {
    async fn refund_buyer(
        &self,
        _provider: PaymentProvider,
        payment_ref: &str,
        _amount: Money,
        _currency: &str,
    ) -> Result<String, ProviderError> {
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("provider timeout".to_string()));
        }
        Ok(format!("prov-refund-{payment_ref}"))
    }

    async fn recover_from_seller(&self, _account: &PaymentAccount, amount: Money) -> Result<Money, ProviderError> {
        Ok(amount.min(self.recoverable))
    }

    async fn refund_deposit(&self, lot: &DepositLot, _amount: Money) -> Result<String, ProviderError> {
        Ok(format!("prov-deposit-{}", lot.id))
    }
}

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// A funded seller with a verified default payout account and one paid order worth `units`.
async fn disputed_order(db: &SqliteDatabase, handle: &str, units: i64) -> (SellerId, OrderId) {
    let seller = db.register_seller(handle).await.unwrap().id;
    db.create_deposit_lot(NewDepositLot {
        seller_id: seller,
        amount: Money::from_units(units + 60),
        provider: PaymentProvider::BankTransfer,
        provider_ref: format!("fund-{handle}"),
        refundable_after: Utc::now() + Duration::days(30),
    })
    .await
    .unwrap();
    let account = db
        .add_payment_account(NewPaymentAccount {
            seller_id: seller,
            provider: PaymentProvider::BankTransfer,
            provider_ref: format!("acct-{handle}"),
        })
        .await
        .unwrap();
    db.set_default_payment_account(account.id, seller).await.unwrap();
    db.verify_payment_account(account.id).await.unwrap();

    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = NewOrder::new(OrderId::from(format!("ord-{handle}")), seller, "buyer-7".to_string(), Money::from_units(units))
        .with_payment(PaymentProvider::CardNetwork, &format!("pay-{handle}"));
    let (_, inserted) = flow.process_new_order(order).await.unwrap();
    (seller, inserted.unwrap().order_id)
}

fn dispute_for(order_id: &OrderId) -> NewDispute {
    NewDispute { order_id: order_id.clone(), opened_by: "buyer-7".to_string(), reason: "item never arrived".to_string() }
}

#[tokio::test]
async fn one_open_dispute_per_order_and_the_full_lifecycle() {
    let db = new_db().await;
    let (_, oid) = disputed_order(&db, "lifecycle", 40).await;
    let api = DisputeApi::new(db.clone(), TestProvider::new(100), EventProducers::default());

    let dispute = api.open_dispute(dispute_for(&oid)).await.unwrap();
    assert_eq!(dispute.status, DisputeStatus::Pending);

    let err = api.open_dispute(dispute_for(&oid)).await.unwrap_err();
    assert!(matches!(err, LedgerError::DisputeAlreadyOpen(_)));

    // A resolution must come out of review, never straight from Pending.
    let err = api.resolve_dispute(dispute.id, "admin", None, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidDisputeState(_, _)));

    let reviewing = api.begin_review(dispute.id).await.unwrap();
    assert_eq!(reviewing.status, DisputeStatus::Reviewing);

    let (resolved, refund) = api.resolve_dispute(dispute.id, "admin", None, Some("no fault found")).await.unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert_eq!(resolved.resolved_by.as_deref(), Some("admin"));
    assert!(refund.is_none());

    // Once resolved, the order can be disputed again.
    assert!(api.open_dispute_for_order(&oid).await.unwrap().is_none());
    api.open_dispute(dispute_for(&oid)).await.unwrap();
}

#[tokio::test]
async fn a_refund_shortfall_becomes_seller_debt() {
    let db = new_db().await;
    let (seller, oid) = disputed_order(&db, "shortfall", 40).await;
    // The provider can only claw back $25 of the $40 refund.
    let api = DisputeApi::new(db.clone(), TestProvider::new(25), EventProducers::default());

    let dispute = api.open_dispute(dispute_for(&oid)).await.unwrap();
    api.begin_review(dispute.id).await.unwrap();
    let (_, refund) =
        api.resolve_dispute(dispute.id, "admin", Some(Money::from_units(40)), Some("refund in full")).await.unwrap();

    // The buyer got the full amount regardless of what the seller could cover.
    let refund = refund.unwrap();
    assert_eq!(refund.status, RefundStatus::Completed);
    assert_eq!(refund.amount, Money::from_units(40));
    assert!(refund.provider_ref.is_some());

    let debts = db.pending_debts(seller).await.unwrap();
    assert_eq!(debts.len(), 1);
    assert_eq!(debts[0].cause, DebtCause::RefundShortfall);
    assert_eq!(debts[0].dispute_id, Some(dispute.id));
    assert_eq!(debts[0].outstanding, Money::from_units(15));
}

#[tokio::test]
async fn a_fully_recovered_refund_books_no_debt() {
    let db = new_db().await;
    let (seller, oid) = disputed_order(&db, "covered", 40).await;
    let api = DisputeApi::new(db.clone(), TestProvider::new(500), EventProducers::default());

    let dispute = api.open_dispute(dispute_for(&oid)).await.unwrap();
    api.begin_review(dispute.id).await.unwrap();
    let (_, refund) = api.resolve_dispute(dispute.id, "admin", Some(Money::from_units(40)), None).await.unwrap();

    assert_eq!(refund.unwrap().status, RefundStatus::Completed);
    assert_eq!(db.outstanding_debt(seller).await.unwrap(), Money::default());
}

#[tokio::test]
async fn a_provider_failure_leaves_the_refund_retryable() {
    let db = new_db().await;
    let (_, oid) = disputed_order(&db, "retry", 40).await;
    let provider = TestProvider::failing(500);
    let api = DisputeApi::new(db.clone(), provider.clone(), EventProducers::default());

    let dispute = api.open_dispute(dispute_for(&oid)).await.unwrap();
    api.begin_review(dispute.id).await.unwrap();

    // The provider bounces the refund. The resolution stands; the obligation parks in Failed.
    let (resolved, refund) = api.resolve_dispute(dispute.id, "admin", Some(Money::from_units(40)), None).await.unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    let refund = refund.unwrap();
    assert_eq!(refund.status, RefundStatus::Failed);
    assert!(refund.provider_ref.is_none());

    // Once the provider is reachable again, a retry completes the refund.
    provider.fail_refunds.store(false, Ordering::SeqCst);
    let completed = api.execute_refund(refund.id).await.unwrap();
    assert_eq!(completed.status, RefundStatus::Completed);
    assert!(completed.provider_ref.is_some());
}

#[tokio::test]
async fn refund_status_moves_are_guarded() {
    let db = new_db().await;
    let (_, oid) = disputed_order(&db, "guards", 40).await;
    let api = DisputeApi::new(db.clone(), TestProvider::new(500), EventProducers::default());

    let dispute = api.open_dispute(dispute_for(&oid)).await.unwrap();
    api.begin_review(dispute.id).await.unwrap();
    let (_, refund) = api.resolve_dispute(dispute.id, "admin", Some(Money::from_units(40)), None).await.unwrap();
    let refund = refund.unwrap();
    assert_eq!(refund.status, RefundStatus::Completed);

    // A completed refund is terminal.
    let err = db.update_refund_status(refund.id, RefundStatus::Processing, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidRefundState(_, _)));
    // And nothing ever moves back to Pending.
    let err = db.update_refund_status(refund.id, RefundStatus::Pending, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidRefundState(_, _)));
}
