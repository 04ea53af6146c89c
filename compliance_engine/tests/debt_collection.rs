//! Debt recovery paths: deposit draining (oldest lot first) and payout interception.
use chrono::{Duration, Utc};
use compliance_engine::{
    db_types::*,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{ComplianceLedger, DebtManagement, LedgerError},
    DebtApi,
    SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn seller_with_debt(db: &SqliteDatabase, handle: &str, debt_units: i64) -> SellerId {
    use compliance_engine::traits::SellerAccounts;
    let seller = db.register_seller(handle).await.unwrap().id;
    db.create_debt(NewDebt {
        seller_id: seller,
        cause: DebtCause::RefundShortfall,
        order_id: None,
        dispute_id: None,
        amount: Money::from_units(debt_units),
    })
    .await
    .unwrap();
    seller
}

fn lot(seller: SellerId, units: i64, provider_ref: &str) -> NewDepositLot {
    NewDepositLot {
        seller_id: seller,
        amount: Money::from_units(units),
        provider: PaymentProvider::BankTransfer,
        provider_ref: provider_ref.to_string(),
        refundable_after: Utc::now() + Duration::days(30),
    }
}

#[tokio::test]
async fn partial_collection_leaves_the_remainder_outstanding() {
    let db = new_db().await;
    let seller = seller_with_debt(&db, "partial", 40).await;
    db.create_deposit_lot(lot(seller, 25, "d-1")).await.unwrap();

    let api = DebtApi::new(db.clone(), EventProducers::default());
    let collection = api.collect_from_deposits(seller).await.unwrap();

    assert_eq!(collection.total_collected, Money::from_units(25));
    assert_eq!(collection.outstanding, Money::from_units(15));
    assert_eq!(collection.debts_settled, 0);
    // Conservation: collected + outstanding equals the original debt.
    assert_eq!(collection.total_collected + collection.outstanding, Money::from_units(40));
    assert_eq!(api.outstanding_debt(seller).await.unwrap(), Money::from_units(15));
}

#[tokio::test]
async fn collection_consumes_oldest_lots_first() {
    let db = new_db().await;
    let seller = seller_with_debt(&db, "fifo", 30).await;
    let (old_lot, _) = db.create_deposit_lot(lot(seller, 20, "d-old")).await.unwrap();
    let (new_lot, _) = db.create_deposit_lot(lot(seller, 50, "d-new")).await.unwrap();

    let api = DebtApi::new(db.clone(), EventProducers::default());
    let collection = api.collect_from_deposits(seller).await.unwrap();
    assert_eq!(collection.total_collected, Money::from_units(30));
    assert_eq!(collection.debts_settled, 1);

    // The older lot is fully forfeited; the newer one only partially consumed.
    let old_lot = db.fetch_deposit_lot(old_lot.id).await.unwrap().unwrap();
    assert_eq!(old_lot.status, DepositLotStatus::Forfeited);
    assert_eq!(old_lot.available(), Money::default());
    let new_lot = db.fetch_deposit_lot(new_lot.id).await.unwrap().unwrap();
    assert_eq!(new_lot.status, DepositLotStatus::Held);
    assert_eq!(new_lot.available(), Money::from_units(40));
}

#[tokio::test]
async fn collecting_with_no_collateral_is_not_an_error() {
    let db = new_db().await;
    let seller = seller_with_debt(&db, "broke", 10).await;
    let api = DebtApi::new(db.clone(), EventProducers::default());
    let collection = api.collect_from_deposits(seller).await.unwrap();
    assert_eq!(collection.total_collected, Money::default());
    assert_eq!(api.outstanding_debt(seller).await.unwrap(), Money::from_units(10));
}

#[tokio::test]
async fn a_violation_penalty_enters_the_collection_pipeline() {
    use compliance_engine::traits::SellerAccounts;
    let db = new_db().await;
    let seller = db.register_seller("fined").await.unwrap().id;
    db.create_deposit_lot(lot(seller, 50, "d-1")).await.unwrap();

    let api = DebtApi::new(db.clone(), EventProducers::default());
    let debt = api.violation_penalty(seller, Money::from_units(20), "admin@platform").await.unwrap();
    assert_eq!(debt.cause, DebtCause::ViolationPenalty);
    assert_eq!(debt.outstanding, Money::from_units(20));

    let collection = api.collect_from_deposits(seller).await.unwrap();
    assert_eq!(collection.total_collected, Money::from_units(20));
    assert_eq!(collection.debts_settled, 1);
    assert_eq!(api.outstanding_debt(seller).await.unwrap(), Money::default());
}

#[tokio::test]
async fn payout_interception_caps_the_deduction_at_the_payout() {
    let db = new_db().await;
    let seller = seller_with_debt(&db, "payout", 30).await;
    let api = DebtApi::new(db.clone(), EventProducers::default());

    let adjustment = api.adjust_payout(seller, Money::from_units(100), "USD").await.unwrap();
    assert_eq!(adjustment.deducted, Money::from_units(30));
    assert_eq!(adjustment.disbursable, Money::from_units(70));
    assert_eq!(adjustment.remaining_debt, Money::default());

    // The interception leaves exactly one audit entry behind.
    use compliance_engine::traits::AuditLog;
    let trail = db.audit_trail_for_seller(seller, 10).await.unwrap();
    let collections = trail.iter().filter(|e| e.action == "debt.collect_payout").count();
    assert_eq!(collections, 1);

    // Debt larger than the payout: the payout goes to zero, never negative.
    let seller2 = seller_with_debt(&db, "payout-2", 80).await;
    let adjustment = api.adjust_payout(seller2, Money::from_units(50), "USD").await.unwrap();
    assert_eq!(adjustment.deducted, Money::from_units(50));
    assert_eq!(adjustment.disbursable, Money::default());
    assert_eq!(adjustment.remaining_debt, Money::from_units(30));
}

#[tokio::test]
async fn payout_interception_rejects_foreign_currency() {
    let db = new_db().await;
    let seller = seller_with_debt(&db, "fx-payout", 10).await;
    let api = DebtApi::new(db.clone(), EventProducers::default());
    let err = api.adjust_payout(seller, Money::from_units(20), "EUR").await.unwrap_err();
    assert!(matches!(err, LedgerError::CurrencyMismatch(_, _)));
}

#[tokio::test]
async fn collection_sweep_covers_every_indebted_seller() {
    let db = new_db().await;
    let a = seller_with_debt(&db, "sweep-a", 10).await;
    let b = seller_with_debt(&db, "sweep-b", 20).await;
    db.create_deposit_lot(lot(a, 10, "d-sa")).await.unwrap();
    db.create_deposit_lot(lot(b, 5, "d-sb")).await.unwrap();

    let api = DebtApi::new(db.clone(), EventProducers::default());
    let report = api.run_collection_sweep().await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 2);
    assert!(report.failures.is_empty());

    assert_eq!(api.outstanding_debt(a).await.unwrap(), Money::default());
    assert_eq!(api.outstanding_debt(b).await.unwrap(), Money::from_units(15));
}
