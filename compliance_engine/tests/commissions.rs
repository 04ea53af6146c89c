//! Commission settlement: held until the order completes, settled exactly once, swept into debt
//! when overdue.
use chrono::{Duration, Utc};
use compliance_engine::{
    db_types::*,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{ComplianceLedger, DebtManagement, LedgerError, SellerAccounts},
    CommissionApi,
    OrderFlowApi,
    SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// A funded seller with one paid order, returning the order id.
async fn seller_with_order(db: &SqliteDatabase, handle: &str, units: i64) -> (SellerId, OrderId) {
    let seller = db.register_seller(handle).await.unwrap().id;
    db.create_deposit_lot(NewDepositLot {
        seller_id: seller,
        amount: Money::from_units(units),
        provider: PaymentProvider::BankTransfer,
        provider_ref: format!("fund-{handle}"),
        refundable_after: Utc::now() + Duration::days(30),
    })
    .await
    .unwrap();
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = NewOrder::new(OrderId::from(format!("ord-{handle}")), seller, "buyer-1".to_string(), Money::from_units(units));
    let (_, inserted) = api.process_new_order(order).await.unwrap();
    (seller, inserted.unwrap().order_id)
}

fn commission(order_id: &OrderId, seller: SellerId, units: i64) -> NewCommission {
    NewCommission {
        order_id: order_id.clone(),
        product_id: "sku-1".to_string(),
        affiliate_id: "aff-9".to_string(),
        seller_id: seller,
        rate_bps: 500,
        amount: Money::from_units(units),
        due_at: Utc::now() + Duration::days(14),
    }
}

#[tokio::test]
async fn settling_before_completion_is_rejected() {
    let db = new_db().await;
    let (seller, oid) = seller_with_order(&db, "early", 50).await;
    let api = CommissionApi::new(db.clone());
    let created = api.create_commission(commission(&oid, seller, 5)).await.unwrap();

    let err = api.settle_commission(created.id, "admin").await.unwrap_err();
    assert!(matches!(err, LedgerError::CommissionOrderNotCompleted(_, _)));

    // Complete the order and the same settle goes through.
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    flow.mark_order_shipped(&oid).await.unwrap();
    flow.complete_order(&oid).await.unwrap();
    let settled = api.settle_commission(created.id, "admin").await.unwrap();
    assert_eq!(settled.status, CommissionStatus::Settled);
}

#[tokio::test]
async fn a_duplicate_settle_is_rejected() {
    let db = new_db().await;
    let (seller, oid) = seller_with_order(&db, "double", 50).await;
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    flow.mark_order_shipped(&oid).await.unwrap();
    flow.complete_order(&oid).await.unwrap();

    let api = CommissionApi::new(db.clone());
    let created = api.create_commission(commission(&oid, seller, 5)).await.unwrap();
    api.settle_commission(created.id, "admin").await.unwrap();

    let err = api.settle_commission(created.id, "admin").await.unwrap_err();
    assert!(matches!(err, LedgerError::CommissionNotPending(_)));
}

#[tokio::test]
async fn commission_creation_is_idempotent_per_order_line() {
    let db = new_db().await;
    let (seller, oid) = seller_with_order(&db, "idem", 50).await;
    let api = CommissionApi::new(db.clone());
    let first = api.create_commission(commission(&oid, seller, 5)).await.unwrap();
    let second = api.create_commission(commission(&oid, seller, 5)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(api.commissions_for_order(&oid).await.unwrap().len(), 1);
}

#[tokio::test]
async fn the_overdue_sweep_books_debt_and_flags_the_obligation() {
    let db = new_db().await;
    let (seller, oid) = seller_with_order(&db, "overdue", 50).await;
    let api = CommissionApi::new(db.clone());
    let mut late = commission(&oid, seller, 8);
    late.due_at = Utc::now() - Duration::days(1);
    let created = api.create_commission(late).await.unwrap();

    let report = api.run_overdue_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.succeeded, 1);

    let flagged = api.fetch_commission(created.id).await.unwrap().unwrap();
    assert_eq!(flagged.status, CommissionStatus::Overdue);
    assert_eq!(db.outstanding_debt(seller).await.unwrap(), Money::from_units(8));

    // A second sweep finds nothing new; the debt is not duplicated.
    let report = api.run_overdue_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(db.outstanding_debt(seller).await.unwrap(), Money::from_units(8));

    // Once recovered, the obligation closes out.
    let resolved = api.resolve_overdue_commission(created.id, "admin").await.unwrap();
    assert_eq!(resolved.status, CommissionStatus::Resolved);
    let err = api.resolve_overdue_commission(created.id, "admin").await.unwrap_err();
    assert!(matches!(err, LedgerError::CommissionNotOverdue(_)));
}
