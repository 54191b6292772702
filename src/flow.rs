/// Session Flow Orchestration
///
/// `Auth` composes the claims builder, token issuer, token verifier and
/// the application hooks into the four authentication flows: authenticate,
/// verify, refresh and logout. Hook groups are validated eagerly at
/// `initialize`; a misconfigured layer refuses to construct instead of
/// failing on the first request.

use actix_web::HttpRequest;
use serde_json::{Map, Value};

use crate::claims::ClaimsBuilder;
use crate::configuration::AuthSettings;
use crate::error::{ConfigError, CredentialError, GateError};
use crate::hooks::AuthHooks;
use crate::token::TokenIssuer;
use crate::verifier::{TokenVerifier, Verification};

/// Tokens minted by the authenticate and refresh flows, together with the
/// JSON delivery output
#[derive(Debug, Clone)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub output: Map<String, Value>,
}

/// Result of the logout flow
#[derive(Debug, Clone)]
pub enum LogoutOutcome {
    /// The presented session was not valid; logout requires one
    Rejected(Verification),
    /// Session terminated; the transport adapter must clear the token
    /// cookie when cookie delivery is in use
    LoggedOut { clear_cookie: bool },
}

/// The `/me` projection: `None` when the caller is anonymous or unknown
#[derive(Debug, Clone)]
pub struct MeView {
    pub me: Option<Value>,
    /// Whether a credential was presented at all; an anonymous caller in
    /// cookie mode gets the stale cookie cleared
    pub credential_presented: bool,
}

/// The authentication layer
///
/// One flow runs per inbound request; flows share no mutable state with
/// one another except through the application's refresh token store.
#[derive(Clone)]
pub struct Auth {
    settings: AuthSettings,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    hooks: AuthHooks,
}

impl Auth {
    /// Construct the layer, validating configuration and hook groups
    ///
    /// This is the single startup step: the claims shape is fixed here
    /// and cannot be mutated afterwards.
    ///
    /// # Errors
    /// - `MissingSecret` for an empty signing secret
    /// - `InvalidValue` for a non-positive token lifetime
    /// - `RefreshTokenNotImplemented` when the refresh feature is enabled
    ///   without the store and identity resolver supplied together
    pub fn initialize(settings: AuthSettings, hooks: AuthHooks) -> Result<Self, ConfigError> {
        if settings.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if settings.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "access_token_expiry must be positive".to_string(),
            ));
        }
        if settings.refresh_token_enabled
            && (hooks.refresh_store.is_none() || hooks.retrieve_user.is_none())
        {
            return Err(ConfigError::RefreshTokenNotImplemented);
        }

        let claims_builder =
            ClaimsBuilder::new(settings.access_token_expiry, hooks.extra_claims.clone());
        let issuer = TokenIssuer::new(
            settings.clone(),
            claims_builder,
            hooks.refresh_store.clone(),
        );
        let verifier = TokenVerifier::new(settings.clone());

        Ok(Self {
            settings,
            issuer,
            verifier,
            hooks,
        })
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Authenticate: credential check, then token issuance
    ///
    /// The application's credential-check error is propagated unmodified,
    /// never swallowed.
    pub async fn authenticate(&self, credentials: &Value) -> Result<TokenBundle, GateError> {
        let identity = self.hooks.authenticate.check(credentials).await?;

        let (access_token, mut output) = self.issuer.issue_access_token(identity.as_ref())?;

        let refresh_token = if self.settings.refresh_token_enabled {
            let token = self.issuer.issue_refresh_token(identity.as_ref()).await?;
            output.insert(
                self.settings.refresh_token_name.clone(),
                Value::String(token.clone()),
            );
            Some(token)
        } else {
            None
        };

        tracing::info!(user_id = %identity.user_id(), "Authentication succeeded");

        Ok(TokenBundle {
            access_token,
            refresh_token,
            output,
        })
    }

    /// Verify: non-throwing tri-state validity check; mutates nothing
    pub fn verify(&self, req: &HttpRequest) -> Verification {
        self.verifier.verify(req)
    }

    /// Refresh: exchange a corroborated refresh token for a new access
    /// token
    ///
    /// The access token's claims are read without signature or expiry
    /// enforcement; an expired access token is the expected input here.
    /// The presented refresh token must exactly equal the stored value:
    /// both sides are UTF-8 strings and the comparison is plain equality,
    /// with no normalization. Any mismatch or absence is a hard failure,
    /// and the store is left untouched on that path.
    pub async fn refresh(
        &self,
        req: &HttpRequest,
        body: Option<&Value>,
    ) -> Result<TokenBundle, GateError> {
        let claims = self.verifier.extract_payload(req, false)?;

        let resolver = self
            .hooks
            .retrieve_user
            .as_ref()
            .ok_or(GateError::Config(ConfigError::RefreshTokenNotImplemented))?;
        let store = self
            .hooks
            .refresh_store
            .as_ref()
            .ok_or(GateError::Config(ConfigError::RefreshTokenNotImplemented))?;

        let identity = resolver
            .retrieve_user(&claims)
            .await?
            .ok_or(GateError::Credential(CredentialError::AuthenticationFailed))?;
        let user_id = identity.user_id();

        let stored = store.retrieve_refresh_token(&user_id).await?;
        let presented = self.refresh_token_from_request(req, body);

        match (stored, presented) {
            (Some(stored), Some(presented)) if stored == presented => {}
            _ => {
                tracing::warn!(user_id = %user_id, "Refresh token mismatch or absent");
                return Err(GateError::Credential(CredentialError::AuthenticationFailed));
            }
        }

        let (access_token, output) = self.issuer.issue_access_token(identity.as_ref())?;

        tracing::info!(user_id = %user_id, "Access token refreshed");

        Ok(TokenBundle {
            access_token,
            refresh_token: None,
            output,
        })
    }

    /// Logout: terminate a currently-valid session
    ///
    /// Requires a valid session; otherwise the invalidity result is
    /// returned as data. Revokes the stored refresh token when the
    /// feature is enabled. Under default configuration (header delivery,
    /// refresh disabled) this is a no-op: deleting a header-delivered
    /// token is the client's responsibility.
    pub async fn logout(&self, req: &HttpRequest) -> Result<LogoutOutcome, GateError> {
        let verification = self.verify(req);
        if !verification.valid {
            return Ok(LogoutOutcome::Rejected(verification));
        }

        let claims = self.verifier.extract_payload(req, true)?;

        if self.settings.refresh_token_enabled {
            if let Some(store) = &self.hooks.refresh_store {
                store.revoke_refresh_token(&claims.user_id).await?;
                tracing::info!(user_id = %claims.user_id, "Refresh token revoked");
            }
        }

        Ok(LogoutOutcome::LoggedOut {
            clear_cookie: self.settings.cookie_set,
        })
    }

    /// Resolve the current identity projection for `/me`
    ///
    /// A missing credential degrades to an anonymous view; an invalid one
    /// is still a hard failure. Without an identity resolver configured
    /// the endpoint reports `MeEndpointNotSetup`, never a generic error.
    pub async fn me(&self, req: &HttpRequest) -> Result<MeView, GateError> {
        let resolver = self
            .hooks
            .retrieve_user
            .as_ref()
            .ok_or(GateError::MeEndpointNotSetup)?;

        match self.verifier.extract_payload(req, true) {
            Ok(claims) => {
                let me = resolver
                    .retrieve_user(&claims)
                    .await?
                    .map(|identity| identity.projection());
                Ok(MeView {
                    me,
                    credential_presented: true,
                })
            }
            Err(GateError::Credential(CredentialError::MissingToken)) => Ok(MeView {
                me: None,
                credential_presented: false,
            }),
            Err(e) => Err(e),
        }
    }

    /// Locate the refresh token presented by the caller: the refresh
    /// cookie in cookie mode, the configured body field otherwise
    fn refresh_token_from_request(&self, req: &HttpRequest, body: Option<&Value>) -> Option<String> {
        if self.settings.cookie_set {
            req.cookie(&self.settings.cookie_refresh_token_name)
                .map(|c| c.value().to_string())
        } else {
            body.and_then(|b| b.get(&self.settings.refresh_token_name))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use crate::hooks::{CredentialCheck, Identity, IdentityResolver};
    use crate::store::{InMemoryRefreshTokenStore, RefreshTokenStore};
    use actix_web::test::TestRequest;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct TestUser {
        id: String,
    }

    impl Identity for TestUser {
        fn user_id(&self) -> String {
            self.id.clone()
        }

        fn projection(&self) -> Value {
            json!({ "id": self.id })
        }
    }

    struct SingleUserCheck;

    #[async_trait]
    impl CredentialCheck for SingleUserCheck {
        async fn check(&self, credentials: &Value) -> Result<Box<dyn Identity>, GateError> {
            if credentials.get("password").and_then(|v| v.as_str()) == Some("hunter2") {
                Ok(Box::new(TestUser { id: "u1".into() }))
            } else {
                Err(GateError::Credential(CredentialError::AuthenticationFailed))
            }
        }
    }

    struct ClaimsResolver;

    #[async_trait]
    impl IdentityResolver for ClaimsResolver {
        async fn retrieve_user(
            &self,
            claims: &crate::claims::Claims,
        ) -> Result<Option<Box<dyn Identity>>, GateError> {
            Ok(Some(Box::new(TestUser {
                id: claims.user_id.clone(),
            })))
        }
    }

    fn refresh_enabled_auth(store: Arc<InMemoryRefreshTokenStore>) -> Auth {
        let mut settings = AuthSettings::new("test-secret-key-at-least-32-characters-long");
        settings.refresh_token_enabled = true;

        let hooks = AuthHooks::new(Arc::new(SingleUserCheck))
            .with_identity_resolver(Arc::new(ClaimsResolver))
            .with_refresh_store(store);

        Auth::initialize(settings, hooks).expect("Failed to initialize auth")
    }

    fn bearer_request(token: &str) -> HttpRequest {
        TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request()
    }

    #[test]
    fn test_initialize_rejects_empty_secret() {
        let settings = AuthSettings::new("");
        let result = Auth::initialize(settings, AuthHooks::new(Arc::new(SingleUserCheck)));

        assert!(matches!(result, Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_initialize_rejects_refresh_without_store() {
        let mut settings = AuthSettings::new("secret");
        settings.refresh_token_enabled = true;

        let hooks = AuthHooks::new(Arc::new(SingleUserCheck))
            .with_identity_resolver(Arc::new(ClaimsResolver));
        let result = Auth::initialize(settings, hooks);

        assert!(matches!(
            result,
            Err(ConfigError::RefreshTokenNotImplemented)
        ));
    }

    #[test]
    fn test_initialize_rejects_refresh_without_resolver() {
        let mut settings = AuthSettings::new("secret");
        settings.refresh_token_enabled = true;

        let hooks = AuthHooks::new(Arc::new(SingleUserCheck))
            .with_refresh_store(Arc::new(InMemoryRefreshTokenStore::new()));
        let result = Auth::initialize(settings, hooks);

        assert!(matches!(
            result,
            Err(ConfigError::RefreshTokenNotImplemented)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_issues_both_tokens() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let auth = refresh_enabled_auth(store.clone());

        let bundle = auth
            .authenticate(&json!({ "password": "hunter2" }))
            .await
            .expect("Authentication should succeed");

        assert!(bundle.output.contains_key("access_token"));
        assert!(bundle.output.contains_key("refresh_token"));
        assert_eq!(
            store.retrieve_refresh_token("u1").await.unwrap(),
            bundle.refresh_token
        );
    }

    #[tokio::test]
    async fn test_authenticate_propagates_credential_failure() {
        let auth = refresh_enabled_auth(Arc::new(InMemoryRefreshTokenStore::new()));

        let result = auth.authenticate(&json!({ "password": "wrong" })).await;
        assert!(matches!(
            result,
            Err(GateError::Credential(CredentialError::AuthenticationFailed))
        ));
    }

    #[tokio::test]
    async fn test_refresh_succeeds_on_exact_match() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let auth = refresh_enabled_auth(store.clone());

        let bundle = auth
            .authenticate(&json!({ "password": "hunter2" }))
            .await
            .unwrap();
        let refresh_token = bundle.refresh_token.clone().unwrap();

        let req = bearer_request(&bundle.access_token);
        let body = json!({ "refresh_token": refresh_token });
        let new_bundle = auth
            .refresh(&req, Some(&body))
            .await
            .expect("Refresh should succeed with the stored token");

        assert!(new_bundle.output.contains_key("access_token"));
        // No rotation: refresh issues an access token only
        assert!(new_bundle.refresh_token.is_none());
        assert_eq!(
            store.retrieve_refresh_token("u1").await.unwrap(),
            Some(refresh_token)
        );
    }

    #[tokio::test]
    async fn test_refresh_fails_on_mismatch_and_leaves_store_unchanged() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let auth = refresh_enabled_auth(store.clone());

        store.store_refresh_token("u1", "R1").await.unwrap();
        let bundle = auth
            .authenticate(&json!({ "password": "hunter2" }))
            .await
            .unwrap();
        let stored_before = store.retrieve_refresh_token("u1").await.unwrap();

        let req = bearer_request(&bundle.access_token);
        let body = json!({ "refresh_token": "R2" });
        let result = auth.refresh(&req, Some(&body)).await;

        assert!(matches!(
            result,
            Err(GateError::Credential(CredentialError::AuthenticationFailed))
        ));
        assert_eq!(
            store.retrieve_refresh_token("u1").await.unwrap(),
            stored_before
        );
    }

    #[tokio::test]
    async fn test_refresh_fails_when_store_is_empty() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let auth = refresh_enabled_auth(store.clone());

        let bundle = auth
            .authenticate(&json!({ "password": "hunter2" }))
            .await
            .unwrap();
        store.revoke_refresh_token("u1").await.unwrap();

        let req = bearer_request(&bundle.access_token);
        let body = json!({ "refresh_token": bundle.refresh_token.clone().unwrap() });
        let result = auth.refresh(&req, Some(&body)).await;

        assert!(matches!(
            result,
            Err(GateError::Credential(CredentialError::AuthenticationFailed))
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_and_subsequent_refresh_fails() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let auth = refresh_enabled_auth(store.clone());

        let bundle = auth
            .authenticate(&json!({ "password": "hunter2" }))
            .await
            .unwrap();

        let req = bearer_request(&bundle.access_token);
        let outcome = auth.logout(&req).await.expect("Logout should succeed");
        assert!(matches!(
            outcome,
            LogoutOutcome::LoggedOut {
                clear_cookie: false
            }
        ));
        assert_eq!(store.retrieve_refresh_token("u1").await.unwrap(), None);

        let body = json!({ "refresh_token": bundle.refresh_token.clone().unwrap() });
        let result = auth.refresh(&req, Some(&body)).await;
        assert!(matches!(
            result,
            Err(GateError::Credential(CredentialError::AuthenticationFailed))
        ));
    }

    #[tokio::test]
    async fn test_logout_rejects_invalid_session() {
        let auth = refresh_enabled_auth(Arc::new(InMemoryRefreshTokenStore::new()));

        let req = TestRequest::default().to_http_request();
        let outcome = auth.logout(&req).await.unwrap();

        match outcome {
            LogoutOutcome::Rejected(v) => {
                assert!(!v.valid);
                assert_eq!(v.reason, Some("missing"));
            }
            _ => panic!("Expected logout rejection"),
        }
    }

    #[tokio::test]
    async fn test_me_without_resolver_reports_not_setup() {
        let settings = AuthSettings::new("secret");
        let auth = Auth::initialize(settings, AuthHooks::new(Arc::new(SingleUserCheck))).unwrap();

        let req = TestRequest::default().to_http_request();
        let result = auth.me(&req).await;

        assert!(matches!(result, Err(GateError::MeEndpointNotSetup)));
    }

    #[tokio::test]
    async fn test_me_treats_missing_credential_as_anonymous() {
        let auth = refresh_enabled_auth(Arc::new(InMemoryRefreshTokenStore::new()));

        let view = auth
            .me(&TestRequest::default().to_http_request())
            .await
            .expect("Anonymous /me should not fail");

        assert!(view.me.is_none());
        assert!(!view.credential_presented);
    }

    #[tokio::test]
    async fn test_me_returns_projection_for_valid_token() {
        let auth = refresh_enabled_auth(Arc::new(InMemoryRefreshTokenStore::new()));

        let bundle = auth
            .authenticate(&json!({ "password": "hunter2" }))
            .await
            .unwrap();
        let view = auth
            .me(&bearer_request(&bundle.access_token))
            .await
            .unwrap();

        assert_eq!(view.me, Some(json!({ "id": "u1" })));
        assert!(view.credential_presented);
    }
}
