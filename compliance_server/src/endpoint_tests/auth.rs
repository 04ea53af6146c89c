use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use compliance_engine::{db_types::Role, events::EventProducers, traits::SweepReport, DebtApi, SellerApi};
use scp_common::Secret;

use super::helpers::{claims_for, get_request, post_request, TEST_GATEWAY_SECRET};
use crate::{
    auth::{sign_identity, CronAccess, IDENTITY_HEADER, SIGNATURE_HEADER},
    endpoint_tests::mocks::MockBackend,
    middleware::IdentityMiddlewareFactory,
    routes::{CronDebtSweepRoute, MyComplianceRoute, RegisterSellerRoute},
};

#[actix_web::test]
async fn a_request_without_identity_headers_is_rejected() {
    let _ = env_logger::try_init().ok();
    let err = get_request(None, "/compliance", configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. No gateway identity was attached to the request.");
}

#[actix_web::test]
async fn a_forged_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("usr_42", Some(1), vec![Role::User]);
    let (payload, signature) = sign_identity(&claims, "a-completely-different-signing-secret!!");
    let req = TestRequest::get()
        .uri("/compliance")
        .insert_header((IDENTITY_HEADER, payload))
        .insert_header((SIGNATURE_HEADER, signature))
        .to_request();
    let secret = Secret::new(TEST_GATEWAY_SECRET.to_string());
    let app = App::new().wrap(IdentityMiddlewareFactory::new(secret)).configure(configure);
    let service = test::init_service(app).await;
    let err = test::try_call_service(&service, req).await.expect_err("Expected error");
    assert_eq!(err.to_string(), "Authentication Error. The gateway identity signature is invalid.");
}

#[actix_web::test]
async fn a_user_cannot_call_admin_routes() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("usr_42", Some(1), vec![Role::User]);
    let body = serde_json::json!({ "handle": "gadget-emporium" });
    let err = post_request(Some(&claims), "/sellers", body, configure).await.expect_err("Expected error");
    assert_eq!(err, "Insufficient permissions");
}

#[actix_web::test]
async fn the_cron_role_does_not_grant_admin_access() {
    let _ = env_logger::try_init().ok();
    let claims = claims_for("scheduler", None, vec![Role::Cron]);
    let body = serde_json::json!({ "handle": "gadget-emporium" });
    let err = post_request(Some(&claims), "/sellers", body, configure).await.expect_err("Expected error");
    assert_eq!(err, "Insufficient permissions");
}

#[actix_web::test]
async fn the_cron_secret_gates_the_sweeps() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_sellers_with_pending_debts().returning(|| Ok(vec![]));
    let api = DebtApi::new(backend, EventProducers::default());
    let cron = CronAccess::new(Secret::new("cron-secret".to_string()));
    let app = App::new()
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(cron))
        .service(CronDebtSweepRoute::<MockBackend>::new());
    let service = test::init_service(app).await;

    let req = TestRequest::post().uri("/debt-sweep").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::post().uri("/debt-sweep").insert_header(("authorization", "Bearer wrong")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req =
        TestRequest::post().uri("/debt-sweep").insert_header(("authorization", "Bearer cron-secret")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let report: SweepReport = test::read_body_json(res).await;
    assert_eq!(report.processed, 0);
}

fn configure(cfg: &mut ServiceConfig) {
    let backend = MockBackend::new();
    let seller_api = SellerApi::new(backend);
    cfg.service(MyComplianceRoute::<MockBackend>::new())
        .service(RegisterSellerRoute::<MockBackend>::new())
        .app_data(web::Data::new(seller_api));
}
