//! Gateway identity middleware.
//!
//! Wraps the `/api` scope. Every request must carry the gateway's signed identity headers; the
//! verified [`AuthClaims`] are stored in the request extensions for the ACL middleware and the
//! handlers to pick up. Requests without a valid signature never reach a handler.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace};
use scp_common::Secret;

use crate::{
    auth::{verify_identity, IDENTITY_HEADER, SIGNATURE_HEADER},
    errors::AuthError,
};

pub struct IdentityMiddlewareFactory {
    secret: Secret<String>,
}

impl IdentityMiddlewareFactory {
    pub fn new(secret: Secret<String>) -> Self {
        IdentityMiddlewareFactory { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = IdentityMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService { secret: self.secret.clone(), service: Rc::new(service) }))
    }
}

pub struct IdentityMiddlewareService<S> {
    secret: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        Box::pin(async move {
            trace!("🔐️ Checking gateway identity for request");
            let claims = extract_claims(&req, &secret).map_err(crate::errors::ServerError::AuthenticationError)?;
            debug!("🔐️ Request authenticated for {} with roles {:?}", claims.sub, claims.roles);
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}

fn extract_claims(req: &ServiceRequest, secret: &str) -> Result<crate::auth::AuthClaims, AuthError> {
    let payload =
        req.headers().get(IDENTITY_HEADER).and_then(|v| v.to_str().ok()).ok_or(AuthError::MissingIdentity)?;
    let signature =
        req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).ok_or(AuthError::MissingIdentity)?;
    verify_identity(payload, signature, secret)
}
