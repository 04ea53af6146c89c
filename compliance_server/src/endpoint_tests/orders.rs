use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use compliance_engine::{
    db_types::{Money, Order, OrderId, OrderStatusType, PaymentProvider, Role, SellerId},
    events::EventProducers,
    traits::{DepositCheck, LedgerError},
    OrderFlowApi,
};

use super::helpers::{claims_for, post_request};
use crate::{
    endpoint_tests::mocks::MockBackend,
    routes::{CompleteOrderRoute, NewOrderRoute},
};

const SELLER: SellerId = SellerId(7);

#[actix_web::test]
async fn an_order_that_passes_the_gate_is_recorded() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("storefront", None, vec![Role::User]);
    let body = order_json();
    let (status, body) = post_request(Some(&claims), "/orders", body, configure_accepting).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let res: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["check"]["requires_deposit"], false);
    assert_eq!(res["order"]["order_id"], "ord-1001");
}

#[actix_web::test]
async fn an_order_blocked_at_the_gate_returns_conflict() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("storefront", None, vec![Role::User]);
    let body = order_json();
    let (status, body) = post_request(Some(&claims), "/orders", body, configure_blocking).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    let check: DepositCheck = serde_json::from_str(&body).unwrap();
    assert!(check.requires_deposit);
    assert_eq!(check.required_amount, Money::from_units(100));
}

#[actix_web::test]
async fn an_invalid_order_transition_returns_conflict() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("storefront", None, vec![Role::User]);
    let (status, body) = post_request(Some(&claims), "/orders/ord-1001/complete", serde_json::json!({}), configure_conflicting)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("error"));
}

fn order_json() -> serde_json::Value {
    serde_json::json!({
        "order_id": "ord-1001",
        "seller_id": 7,
        "buyer_id": "buyer-1",
        "total_price": 15_00,
        "currency": "USD",
        "payment_provider": "CardNetwork",
        "payment_ref": "pay-abc"
    })
}

fn order() -> Order {
    Order {
        id: 1,
        order_id: OrderId::from("ord-1001".to_string()),
        seller_id: SELLER,
        buyer_id: "buyer-1".to_string(),
        total_price: Money::from_units(15),
        currency: "USD".to_string(),
        payment_provider: PaymentProvider::CardNetwork,
        payment_ref: "pay-abc".to_string(),
        status: OrderStatusType::Paid,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn configure_accepting(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_process_new_order().returning(|_| {
        let check = DepositCheck::satisfied(SELLER, Money::from_units(15), Money::from_units(50));
        Ok((check, Some(order())))
    });
    backend.expect_record_audit().returning(|_| Ok(1));
    configure_with(cfg, backend);
}

fn configure_blocking(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_process_new_order().returning(|_| {
        let check = DepositCheck::short(SELLER, Money::from_units(120), Money::from_units(20), None);
        Ok((check, None))
    });
    backend.expect_record_audit().returning(|_| Ok(1));
    configure_with(cfg, backend);
}

fn configure_conflicting(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_complete_order().returning(|id| {
        Err(LedgerError::InvalidOrderTransition(id.clone(), OrderStatusType::Completed, OrderStatusType::Completed))
    });
    configure_with(cfg, backend);
}

fn configure_with(cfg: &mut ServiceConfig, backend: MockBackend) {
    let api = OrderFlowApi::new(backend, EventProducers::default());
    cfg.service(NewOrderRoute::<MockBackend>::new())
        .service(CompleteOrderRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}
