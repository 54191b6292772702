/// Protected Route Middleware
///
/// Validates the access token on each request (Authorization header or
/// cookie, per the configured delivery mode) and injects the verified
/// claims into request extensions for the downstream handler. Missing and
/// invalid credentials are rejected with distinct structured 401s.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ResponseError,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::flow::Auth;

/// Guard for routes that require authentication
///
/// ```ignore
/// web::scope("/api").wrap(Protected::new(auth.clone()))
/// ```
pub struct Protected {
    auth: Auth,
}

impl Protected {
    pub fn new(auth: Auth) -> Self {
        Self { auth }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Protected
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ProtectedService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(ProtectedService {
            service: Rc::new(service),
            auth: self.auth.clone(),
        }))
    }
}

pub struct ProtectedService<S> {
    service: Rc<S>,
    auth: Auth,
}

impl<S, B> Service<ServiceRequest> for ProtectedService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.auth.verifier().extract_payload(req.request(), true) {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.user_id, "Request authenticated");
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                let response = e.error_response();
                Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response("Unauthorized", response)
                        .into())
                })
            }
        }
    }
}
