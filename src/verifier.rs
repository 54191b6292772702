/// Token Verification
///
/// Locates the access token on an incoming request (Authorization header
/// by default, the configured cookie in cookie-delivery mode), decodes it
/// and checks signature and expiry.
///
/// Two paths are exposed on purpose: a throwing extraction for endpoints
/// that fail the whole request, and a non-throwing `verify` for endpoints
/// that report validity as data.

use actix_web::http::StatusCode;
use actix_web::HttpRequest;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use crate::claims::Claims;
use crate::configuration::AuthSettings;
use crate::error::{CredentialError, GateError};

/// Structured result of the non-throwing verification path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub status: StatusCode,
    pub reason: Option<&'static str>,
}

impl Verification {
    fn ok() -> Self {
        Self {
            valid: true,
            status: StatusCode::OK,
            reason: None,
        }
    }

    fn rejected(error: &CredentialError) -> Self {
        Self {
            valid: false,
            status: StatusCode::UNAUTHORIZED,
            reason: Some(error.reason()),
        }
    }
}

/// Parses and validates incoming access tokens
#[derive(Clone)]
pub struct TokenVerifier {
    settings: AuthSettings,
}

impl TokenVerifier {
    pub fn new(settings: AuthSettings) -> Self {
        Self { settings }
    }

    /// Locate the raw token on the request
    ///
    /// One canonical source per delivery mode: the configured cookie when
    /// cookie delivery is on, the `Authorization: Bearer` header
    /// otherwise. Absence is `MissingToken`, distinct from a token that
    /// fails validation.
    pub fn extract_token(&self, req: &HttpRequest) -> Result<String, GateError> {
        let token = if self.settings.cookie_set {
            req.cookie(&self.settings.cookie_token_name)
                .map(|c| c.value().to_string())
        } else {
            req.headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
        };

        token.ok_or(GateError::Credential(CredentialError::MissingToken))
    }

    /// Decode the token and return its claims
    ///
    /// With `verify` set, signature and expiry are enforced and reported
    /// distinctly. Without it the claims are decoded but not trusted; the
    /// refresh and logout flows need the payload of a possibly-expired
    /// token.
    pub fn extract_payload(&self, req: &HttpRequest, verify: bool) -> Result<Claims, GateError> {
        let token = self.extract_token(req)?;

        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: a token is expired the moment its exp passes
        validation.leeway = 0;
        if !verify {
            validation.insecure_disable_signature_validation();
            validation.validate_exp = false;
        }

        decode::<Claims>(
            &token,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("Token validation error: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    GateError::Credential(CredentialError::TokenExpired)
                }
                _ => GateError::Credential(CredentialError::TokenInvalid),
            }
        })
    }

    /// Non-throwing validity check
    ///
    /// 200 when valid; 401 with reason "missing", "expired" or "invalid"
    /// when not. Never mutates any state.
    pub fn verify(&self, req: &HttpRequest) -> Verification {
        match self.extract_payload(req, true) {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.user_id, "Token verified");
                Verification::ok()
            }
            Err(GateError::Credential(e)) => Verification::rejected(&e),
            Err(_) => Verification::rejected(&CredentialError::TokenInvalid),
        }
    }
}
