//! Gateway identity handling.
//!
//! End users never authenticate against this server directly. The API gateway terminates user
//! authentication and forwards the caller's identity in two headers:
//! * `x-sce-identity` — a JSON-encoded [`AuthClaims`] payload.
//! * `x-sce-signature` — the hex HMAC-SHA256 of the identity payload, keyed with the shared
//!   gateway secret.
//!
//! A request whose signature does not verify is treated as unauthenticated, regardless of what
//! the identity payload claims.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use compliance_engine::db_types::{Role, Roles, SellerId};
use scp_common::Secret;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{AuthError, ServerError},
    helpers::calculate_hmac,
};

pub const IDENTITY_HEADER: &str = "x-sce-identity";
pub const SIGNATURE_HEADER: &str = "x-sce-signature";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// The gateway-side subject identifier. Used as the actor in audit records.
    pub sub: String,
    /// The seller account bound to this caller, when there is one. Seller-scoped routes refuse
    /// callers without one.
    pub seller_id: Option<SellerId>,
    pub roles: Roles,
}

impl AuthClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// The seller this caller is bound to, or a 403 for callers without one.
    pub fn require_seller(&self) -> Result<SellerId, AuthError> {
        self.seller_id.ok_or_else(|| {
            AuthError::InsufficientPermissions("No seller account is bound to this identity.".to_string())
        })
    }
}

impl FromRequest for AuthClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req
            .extensions()
            .get::<AuthClaims>()
            .cloned()
            .ok_or_else(|| ServerError::AuthenticationError(AuthError::MissingIdentity).into());
        ready(claims)
    }
}

/// Guards the `/cron` endpoints. The scheduler is not a gateway user; it presents the shared
/// cron secret as a bearer token instead.
#[derive(Clone)]
pub struct CronAccess {
    secret: Secret<String>,
}

impl CronAccess {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    pub fn check(&self, req: &HttpRequest) -> Result<(), AuthError> {
        let token = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::InvalidCronSecret)?;
        if token == self.secret.reveal().as_str() {
            Ok(())
        } else {
            Err(AuthError::InvalidCronSecret)
        }
    }
}

/// Verify the signature over the raw identity payload and deserialize the claims.
pub fn verify_identity(payload: &str, signature: &str, secret: &str) -> Result<AuthClaims, AuthError> {
    let expected = calculate_hmac(secret, payload.as_bytes());
    if signature != expected.as_str() {
        return Err(AuthError::InvalidSignature);
    }
    serde_json::from_str(payload).map_err(|e| AuthError::PoorlyFormattedIdentity(e.to_string()))
}

/// Sign a claims payload the way the gateway does. Used by tests and by the gateway contract
/// documentation.
pub fn sign_identity(claims: &AuthClaims, secret: &str) -> (String, String) {
    let payload = serde_json::to_string(claims).expect("AuthClaims serialization is infallible");
    let signature = calculate_hmac(secret, payload.as_bytes());
    (payload, signature)
}

#[cfg(test)]
mod test {
    use super::*;

    fn claims() -> AuthClaims {
        AuthClaims { sub: "usr_123".into(), seller_id: Some(SellerId(5)), roles: vec![Role::User] }
    }

    #[test]
    fn a_signed_identity_round_trips() {
        let (payload, sig) = sign_identity(&claims(), "super-secret");
        let verified = verify_identity(&payload, &sig, "super-secret").unwrap();
        assert_eq!(verified, claims());
    }

    #[test]
    fn a_tampered_payload_is_rejected() {
        let (payload, sig) = sign_identity(&claims(), "super-secret");
        let tampered = payload.replace("usr_123", "usr_666");
        assert!(matches!(verify_identity(&tampered, &sig, "super-secret"), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn the_wrong_secret_is_rejected() {
        let (payload, sig) = sign_identity(&claims(), "super-secret");
        assert!(matches!(verify_identity(&payload, &sig, "other-secret"), Err(AuthError::InvalidSignature)));
    }
}
