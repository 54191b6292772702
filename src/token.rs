/// Token Issuance
///
/// Mints access tokens from a verified identity and, when the refresh
/// feature is enabled, opaque refresh tokens persisted through the
/// application's store.

use jsonwebtoken::{encode, EncodingKey, Header};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::claims::ClaimsBuilder;
use crate::configuration::AuthSettings;
use crate::error::{ConfigError, GateError};
use crate::hooks::Identity;
use crate::store::RefreshTokenStore;

/// Generate a new cryptographically secure refresh token
///
/// A 64-character alphanumeric string. The token itself is opaque; its
/// validity is corroborated against the store, never self-contained.
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Issues access and refresh tokens
#[derive(Clone)]
pub struct TokenIssuer {
    settings: AuthSettings,
    claims_builder: ClaimsBuilder,
    store: Option<Arc<dyn RefreshTokenStore>>,
}

impl TokenIssuer {
    pub fn new(
        settings: AuthSettings,
        claims_builder: ClaimsBuilder,
        store: Option<Arc<dyn RefreshTokenStore>>,
    ) -> Self {
        Self {
            settings,
            claims_builder,
            store,
        }
    }

    /// Mint a signed access token for an identity
    ///
    /// Returns the token together with the delivery output
    /// `{access_token_name: token}`. No side effects beyond clock reads.
    ///
    /// # Errors
    /// Returns error if token encoding fails
    pub fn issue_access_token(
        &self,
        identity: &dyn Identity,
    ) -> Result<(String, Map<String, Value>), GateError> {
        let claims = self.claims_builder.build(identity);

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| GateError::Internal(format!("Token generation failed: {}", e)))?;

        let mut output = Map::new();
        output.insert(
            self.settings.access_token_name.clone(),
            Value::String(token.clone()),
        );

        Ok((token, output))
    }

    /// Generate an opaque refresh token and persist it keyed by user id
    ///
    /// Mutates external store state; only available when the refresh
    /// feature was enabled at initialization.
    ///
    /// # Errors
    /// Returns error if the feature is disabled or the store write fails
    pub async fn issue_refresh_token(&self, identity: &dyn Identity) -> Result<String, GateError> {
        let store = self
            .store
            .as_ref()
            .ok_or(GateError::Config(ConfigError::RefreshTokenNotImplemented))?;

        let user_id = identity.user_id();
        let refresh_token = generate_refresh_token();
        store.store_refresh_token(&user_id, &refresh_token).await?;

        tracing::info!(user_id = %user_id, "Refresh token issued");

        Ok(refresh_token)
    }
}
