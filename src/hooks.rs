/// Application Hooks
///
/// The host application plugs into the layer through these traits. They
/// are collected in an `AuthHooks` value passed once to
/// `Auth::initialize`, which validates required groups eagerly instead of
/// discovering a missing hook at request time.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::claims::{Claims, ExtraClaims};
use crate::error::GateError;
use crate::store::RefreshTokenStore;

/// An authenticated application identity
///
/// The layer never inspects the identity beyond these two capabilities:
/// a deterministic user id, and a canonical serialization used as the
/// "me" view.
pub trait Identity: Send + Sync {
    fn user_id(&self) -> String;
    fn projection(&self) -> Value;
}

/// Application-supplied credential check, run by the authenticate flow
///
/// Receives the parsed JSON body of the login request. Errors are
/// propagated to the caller unmodified, so the application controls the
/// failure response.
#[async_trait]
pub trait CredentialCheck: Send + Sync {
    async fn check(&self, credentials: &Value) -> Result<Box<dyn Identity>, GateError>;
}

/// Resolves the identity behind a set of verified (or, for refresh,
/// merely decoded) claims
///
/// Returning `Ok(None)` means the user no longer exists; the flows treat
/// that as an authentication failure or an anonymous caller depending on
/// the endpoint.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn retrieve_user(&self, claims: &Claims) -> Result<Option<Box<dyn Identity>>, GateError>;
}

/// The full set of hooks an application can supply
#[derive(Clone)]
pub struct AuthHooks {
    pub authenticate: Arc<dyn CredentialCheck>,
    pub retrieve_user: Option<Arc<dyn IdentityResolver>>,
    pub refresh_store: Option<Arc<dyn RefreshTokenStore>>,
    pub extra_claims: Option<Arc<dyn ExtraClaims>>,
}

impl AuthHooks {
    /// Hooks with only the mandatory credential check
    pub fn new(authenticate: Arc<dyn CredentialCheck>) -> Self {
        Self {
            authenticate,
            retrieve_user: None,
            refresh_store: None,
            extra_claims: None,
        }
    }

    pub fn with_identity_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.retrieve_user = Some(resolver);
        self
    }

    pub fn with_refresh_store(mut self, store: Arc<dyn RefreshTokenStore>) -> Self {
        self.refresh_store = Some(store);
        self
    }

    pub fn with_extra_claims(mut self, extra: Arc<dyn ExtraClaims>) -> Self {
        self.extra_claims = Some(extra);
        self
    }
}
