/// Token Claims
///
/// The signed payload embedded in an access token: a user id, the standard
/// timestamp claims, and a flat map of application-defined extras.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::hooks::Identity;

/// Claims carried by every access token
///
/// `user_id` and the timestamps are reserved; application extras are
/// flattened alongside them in the encoded payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Deterministic user id extracted from the authenticated identity
    pub user_id: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Application-defined extra claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }

    /// Look up an application-defined extra claim
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Hook extending the claims written into every access token
///
/// Supplied once at initialization; the claims shape is process-wide and
/// immutable after the layer is constructed.
pub trait ExtraClaims: Send + Sync {
    fn extend(&self, identity: &dyn Identity, extra: &mut Map<String, Value>);
}

impl<F> ExtraClaims for F
where
    F: Fn(&dyn Identity, &mut Map<String, Value>) + Send + Sync,
{
    fn extend(&self, identity: &dyn Identity, extra: &mut Map<String, Value>) {
        self(identity, extra)
    }
}

/// Builds the claims for token issuance
///
/// Constructed exactly once inside `Auth::initialize`; there is no API to
/// mutate it afterwards.
#[derive(Clone)]
pub struct ClaimsBuilder {
    token_ttl: i64,
    extra: Option<Arc<dyn ExtraClaims>>,
}

impl ClaimsBuilder {
    pub fn new(token_ttl: i64, extra: Option<Arc<dyn ExtraClaims>>) -> Self {
        Self { token_ttl, extra }
    }

    /// Produce the claims for an authenticated identity
    ///
    /// The extras hook runs first; the reserved fields are written after
    /// it, so a hook cannot shadow `user_id`, `exp` or `iat`.
    pub fn build(&self, identity: &dyn Identity) -> Claims {
        let mut extra = Map::new();
        if let Some(hook) = &self.extra {
            hook.extend(identity, &mut extra);
            extra.remove("user_id");
            extra.remove("exp");
            extra.remove("iat");
        }

        let now = chrono::Utc::now().timestamp();
        Claims {
            user_id: identity.user_id(),
            exp: now + self.token_ttl,
            iat: now,
            extra,
        }
    }
}
