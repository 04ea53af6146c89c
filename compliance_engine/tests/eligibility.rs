//! Payout eligibility: fact-driven, fail-closed, and written through a single path.
use chrono::{Duration, Utc};
use compliance_engine::{
    db_types::*,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{ComplianceLedger, DebtManagement, SellerAccounts},
    EligibilityApi,
    SellerApi,
    SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Brings a seller to a fully eligible state: active subscription, verified default account.
async fn eligible_seller(db: &SqliteDatabase, handle: &str) -> SellerId {
    let seller = db.register_seller(handle).await.unwrap().id;
    let api = SellerApi::new(db.clone());
    api.set_subscription(seller, DepositTier::Tier50, Utc::now() + Duration::days(30)).await.unwrap();
    let account = api
        .add_payment_account(NewPaymentAccount {
            seller_id: seller,
            provider: PaymentProvider::BankTransfer,
            provider_ref: format!("acct-{handle}"),
        })
        .await
        .unwrap();
    api.set_default_payment_account(account.id, seller).await.unwrap();
    api.verify_payment_account(account.id).await.unwrap();
    seller
}

async fn current_status(db: &SqliteDatabase, seller: SellerId) -> PayoutEligibility {
    db.fetch_seller(seller).await.unwrap().unwrap().payout_eligibility
}

#[tokio::test]
async fn a_new_seller_is_pending_review_not_eligible() {
    let db = new_db().await;
    let seller = db.register_seller("fresh").await.unwrap().id;
    let api = EligibilityApi::new(db.clone(), EventProducers::default());
    let update = api.refresh(seller).await.unwrap();
    assert_eq!(update.current, PayoutEligibility::PendingReview);
    assert!(!update.current.can_receive_funds());
}

#[tokio::test]
async fn a_fully_set_up_seller_becomes_eligible() {
    let db = new_db().await;
    let seller = eligible_seller(&db, "golden").await;
    assert_eq!(current_status(&db, seller).await, PayoutEligibility::Eligible);
}

#[tokio::test]
async fn a_disabled_provider_account_blocks_payouts() {
    let db = new_db().await;
    let seller = eligible_seller(&db, "disabled").await;
    let api = SellerApi::new(db.clone());
    let account = db.default_payment_account(seller).await.unwrap().unwrap();

    api.set_provider_account_health(account.id, false).await.unwrap();
    assert_eq!(current_status(&db, seller).await, PayoutEligibility::Blocked);

    // Recovery is symmetric: the provider re-enabling the account restores eligibility.
    api.set_provider_account_health(account.id, true).await.unwrap();
    assert_eq!(current_status(&db, seller).await, PayoutEligibility::Eligible);
}

#[tokio::test]
async fn a_risk_flag_blocks_and_unblocks() {
    let db = new_db().await;
    let seller = eligible_seller(&db, "risky").await;
    let api = SellerApi::new(db.clone());

    api.set_risk_flag(seller, true).await.unwrap();
    assert_eq!(current_status(&db, seller).await, PayoutEligibility::Blocked);
    api.set_risk_flag(seller, false).await.unwrap();
    assert_eq!(current_status(&db, seller).await, PayoutEligibility::Eligible);
}

#[tokio::test]
async fn refresh_is_idempotent() {
    let db = new_db().await;
    let seller = eligible_seller(&db, "idempotent").await;
    let api = EligibilityApi::new(db.clone(), EventProducers::default());

    let first = api.refresh(seller).await.unwrap();
    let second = api.refresh(seller).await.unwrap();
    assert_eq!(first.current, second.current);
    assert!(!second.changed());
}

#[tokio::test]
async fn an_old_uncollected_debt_blocks_payouts() {
    let db = new_db().await;
    let seller = eligible_seller(&db, "deadbeat").await;
    db.create_debt(NewDebt {
        seller_id: seller,
        cause: DebtCause::ViolationPenalty,
        order_id: None,
        dispute_id: None,
        amount: Money::from_units(25),
    })
    .await
    .unwrap();

    // A fresh debt does not block on its own; only one past the overdue window does, and that
    // window is measured from creation. Backdate the debt to simulate it.
    sqlx::query("UPDATE seller_debts SET created_at = datetime('now', '-45 days') WHERE seller_id = $1")
        .bind(seller)
        .execute(db.pool())
        .await
        .unwrap();

    let api = EligibilityApi::new(db.clone(), EventProducers::default());
    let update = api.refresh(seller).await.unwrap();
    assert_eq!(update.current, PayoutEligibility::Blocked);
    assert!(update.facts.overdue_debt);
}

#[tokio::test]
async fn subscription_lapse_sweep_downgrades_eligibility() {
    let db = new_db().await;
    let seller = eligible_seller(&db, "lapsed").await;
    let api = SellerApi::new(db.clone());
    // Shrink the subscription to one that expired yesterday.
    api.set_subscription(seller, DepositTier::Tier50, Utc::now() - Duration::days(1)).await.unwrap();

    let report = api.run_subscription_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(current_status(&db, seller).await, PayoutEligibility::PendingReview);
}
