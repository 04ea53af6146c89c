//! Collateral gate behaviour: orders only clear while deposit collateral covers the seller's
//! total unfulfilled exposure.
use chrono::{Duration, Utc};
use compliance_engine::{
    db_types::*,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{ComplianceLedger, SellerAccounts},
    OrderFlowApi,
    SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn order(id: &str, seller: SellerId, units: i64) -> NewOrder {
    NewOrder::new(OrderId::from(id.to_string()), seller, format!("buyer-{id}"), Money::from_units(units))
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
async fn exposure_beyond_collateral_blocks_the_order() {
    let db = new_db().await;
    let seller = db.register_seller("gate-seller").await.unwrap().id;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    // No collateral at all: a $50 order is already too much.
    let (check, inserted) = api.process_new_order(order("g-1", seller, 50)).await.unwrap();
    assert!(check.requires_deposit);
    assert!(inserted.is_none());
    assert_eq!(check.required_amount, Money::from_units(50));

    // A $60 lot covers the $50 order...
    db.create_deposit_lot(lot(seller, 60, "fund-1")).await.unwrap();
    let (check, inserted) = api.process_new_order(order("g-1", seller, 50)).await.unwrap();
    assert!(!check.requires_deposit);
    assert!(inserted.is_some());

    // ...but an $80 order on top pushes exposure to $130, which $60 does not cover.
    let (check, inserted) = api.process_new_order(order("g-2", seller, 80)).await.unwrap();
    assert!(check.requires_deposit);
    assert!(inserted.is_none());
    assert_eq!(check.total_exposure, Money::from_units(130));
    assert_eq!(check.required_amount, Money::from_units(70));
    // The suggested tier must cover the full exposure, so the $100 tier is not enough.
    assert_eq!(check.suggested_tier, Some(DepositTier::Tier300));
}

#[tokio::test]
async fn fulfilled_orders_release_exposure() {
    let db = new_db().await;
    let seller = db.register_seller("release-seller").await.unwrap().id;
    db.create_deposit_lot(lot(seller, 100, "fund-2")).await.unwrap();
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let (_, inserted) = api.process_new_order(order("r-1", seller, 90)).await.unwrap();
    let oid = inserted.unwrap().order_id;

    // Shipped orders still count as exposure.
    api.mark_order_shipped(&oid).await.unwrap();
    let (check, inserted) = api.process_new_order(order("r-2", seller, 40)).await.unwrap();
    assert!(check.requires_deposit);
    assert!(inserted.is_none());

    // Completion releases it and the next order clears.
    api.complete_order(&oid).await.unwrap();
    let (check, inserted) = api.process_new_order(order("r-2", seller, 40)).await.unwrap();
    assert!(!check.requires_deposit);
    assert!(inserted.is_some());
}

#[tokio::test]
async fn cancelled_orders_release_exposure() {
    let db = new_db().await;
    let seller = db.register_seller("cancel-seller").await.unwrap().id;
    db.create_deposit_lot(lot(seller, 50, "fund-3")).await.unwrap();
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let (_, inserted) = api.process_new_order(order("c-1", seller, 50)).await.unwrap();
    let oid = inserted.unwrap().order_id;
    api.cancel_order(&oid).await.unwrap();
    assert_eq!(db.exposure_for_seller(seller).await.unwrap(), Money::default());
}

#[tokio::test]
async fn funding_webhook_replay_does_not_double_count() {
    let db = new_db().await;
    let seller = db.register_seller("replay-seller").await.unwrap().id;
    let (first, created) = db.create_deposit_lot(lot(seller, 40, "fund-4")).await.unwrap();
    assert!(created);
    let (second, created) = db.create_deposit_lot(lot(seller, 40, "fund-4")).await.unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
    assert_eq!(db.collateral_for_seller(seller).await.unwrap(), Money::from_units(40));
}

#[tokio::test]
async fn release_is_refused_while_the_lot_secures_exposure() {
    let db = new_db().await;
    let seller = db.register_seller("locked-seller").await.unwrap().id;
    let (lot_row, _) = db.create_deposit_lot(lot(seller, 50, "fund-5")).await.unwrap();
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    api.process_new_order(order("l-1", seller, 45)).await.unwrap();

    let err = db.release_deposit_lot(lot_row.id).await.unwrap_err();
    assert!(matches!(err, compliance_engine::traits::LedgerError::LotStillSecuringExposure(_)));
}

#[tokio::test]
async fn a_lot_cannot_skip_straight_from_held_to_refunding() {
    let db = new_db().await;
    let seller = db.register_seller("eager-seller").await.unwrap().id;
    let mut new_lot = lot(seller, 30, "fund-7");
    new_lot.refundable_after = Utc::now() - Duration::days(1);
    let (lot_row, _) = db.create_deposit_lot(new_lot).await.unwrap();
    assert_eq!(lot_row.status, DepositLotStatus::Held);

    // The hold period has lapsed, but the lot was never released to Refundable.
    let err = db.request_deposit_refund(lot_row.id, seller).await.unwrap_err();
    assert!(matches!(err, compliance_engine::traits::LedgerError::InvalidLotState { .. }));
}

#[tokio::test]
async fn orders_in_unknown_currencies_are_rejected_not_waved_through() {
    let db = new_db().await;
    let seller = db.register_seller("fx-seller").await.unwrap().id;
    db.create_deposit_lot(lot(seller, 1_000, "fund-6")).await.unwrap();
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let new_order = order("fx-1", seller, 10).with_currency("JPY");
    let err = api.process_new_order(new_order).await.unwrap_err();
    assert!(matches!(err, compliance_engine::traits::LedgerError::UnknownCurrency(_)));
}
