use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use compliance_engine::{
    db_types::{Money, PayoutEligibility, Role, Seller, SellerId},
    SellerApi,
};

use super::helpers::{claims_for, get_request, post_request};
use crate::{
    endpoint_tests::mocks::MockBackend,
    routes::{AddPaymentAccountRoute, ComplianceSnapshotRoute, MyComplianceRoute},
};

#[actix_web::test]
async fn a_caller_without_a_seller_binding_cannot_fetch_their_standing() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("usr_42", None, vec![Role::User]);
    let (status, body) = get_request(Some(&claims), "/compliance", configure_empty).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("No seller account is bound to this identity."));
}

#[actix_web::test]
async fn an_unknown_seller_returns_not_found() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("ops_1", None, vec![Role::Admin]);
    let (status, _) = get_request(Some(&claims), "/sellers/99/compliance", configure_unknown).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn the_compliance_snapshot_is_assembled_from_the_ledger() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("ops_1", None, vec![Role::Admin]);
    let (status, body) = get_request(Some(&claims), "/sellers/7/compliance", configure_snapshot).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let snapshot: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snapshot["payout_eligibility"], "Eligible");
    assert_eq!(snapshot["exposure"], 40_00);
    assert_eq!(snapshot["collateral"], 100_00);
    assert_eq!(snapshot["seller"]["handle"], "gadget-emporium");
}

#[actix_web::test]
async fn a_seller_cannot_add_an_account_to_another_profile() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("usr_42", Some(1), vec![Role::User]);
    let body = serde_json::json!({ "seller_id": 2, "provider": "BankTransfer", "provider_ref": "acct-555" });
    let (status, body) =
        post_request(Some(&claims), "/payment-accounts", body, configure_empty).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("your own seller profile"));
}

fn seller() -> Seller {
    Seller {
        id: SellerId(7),
        handle: "gadget-emporium".to_string(),
        payout_eligibility: PayoutEligibility::Eligible,
        risk_flagged: false,
        subscription_tier: None,
        subscription_expires_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn configure_empty(cfg: &mut ServiceConfig) {
    configure_with(cfg, MockBackend::new());
}

fn configure_unknown(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_seller().returning(|_| Ok(None));
    configure_with(cfg, backend);
}

fn configure_snapshot(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_seller().returning(|_| Ok(Some(seller())));
    backend.expect_exposure_for_seller().returning(|_| Ok(Money::from_units(40)));
    backend.expect_collateral_for_seller().returning(|_| Ok(Money::from_units(100)));
    backend.expect_outstanding_debt().returning(|_| Ok(Money::default()));
    configure_with(cfg, backend);
}

fn configure_with(cfg: &mut ServiceConfig, backend: MockBackend) {
    let api = SellerApi::new(backend);
    cfg.service(MyComplianceRoute::<MockBackend>::new())
        .service(ComplianceSnapshotRoute::<MockBackend>::new())
        .service(AddPaymentAccountRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}
