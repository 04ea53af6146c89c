use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use compliance_engine::db_types::{Role, SellerId};
use log::debug;
use scp_common::Secret;
use serde_json::Value;

use crate::{
    auth::{sign_identity, AuthClaims, IDENTITY_HEADER, SIGNATURE_HEADER},
    middleware::IdentityMiddlewareFactory,
};

// A fixed signing secret for endpoint tests. DO NOT re-use this value anywhere.
pub const TEST_GATEWAY_SECRET: &str = "endpoint-test-gateway-secret-0123456789";

pub fn claims_for(sub: &str, seller_id: Option<i64>, roles: Vec<Role>) -> AuthClaims {
    AuthClaims { sub: sub.to_string(), seller_id: seller_id.map(SellerId), roles }
}

pub async fn get_request(
    claims: Option<&AuthClaims>,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::get().uri(path);
    send_request(claims, req, configure).await
}

pub async fn post_request(
    claims: Option<&AuthClaims>,
    path: &str,
    body: Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::post().uri(path).set_json(body);
    send_request(claims, req, configure).await
}

async fn send_request(
    claims: Option<&AuthClaims>,
    mut req: TestRequest,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    if let Some(claims) = claims {
        let (payload, signature) = sign_identity(claims, TEST_GATEWAY_SECRET);
        req = req.insert_header((IDENTITY_HEADER, payload)).insert_header((SIGNATURE_HEADER, signature));
    }
    let req = req.to_request();
    let secret = Secret::new(TEST_GATEWAY_SECRET.to_string());
    let app = App::new().wrap(IdentityMiddlewareFactory::new(secret)).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}
