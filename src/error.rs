/// Error Handling Module
///
/// Unified error handling for the authentication layer:
/// 1. Domain-specific error types (configuration vs. credential failures)
/// 2. Control flow errors (Result-based)
/// 3. HTTP responses with structured context
/// 4. Structured error logging

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Configuration errors, fatal at initialization
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Refresh-token feature enabled without the store and identity
    /// resolver supplied together
    RefreshTokenNotImplemented,
    MissingSecret,
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::RefreshTokenNotImplemented => write!(
                f,
                "refresh tokens are enabled but the refresh token store and identity resolver were not both supplied"
            ),
            ConfigError::MissingSecret => write!(f, "signing secret is empty"),
            ConfigError::InvalidValue(msg) => write!(f, "invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Credential errors surfaced as authentication-failure responses
///
/// `MissingToken` (no credential presented) is distinct from
/// `TokenInvalid`/`TokenExpired` (credential presented but rejected) so
/// endpoints can treat an anonymous caller differently from a forged one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    AuthenticationFailed,
    MissingToken,
    TokenExpired,
    TokenInvalid,
}

impl CredentialError {
    /// Short reason string used by the non-throwing verification path
    pub fn reason(&self) -> &'static str {
        match self {
            CredentialError::MissingToken => "missing",
            CredentialError::TokenExpired => "expired",
            CredentialError::AuthenticationFailed | CredentialError::TokenInvalid => "invalid",
        }
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::AuthenticationFailed => write!(f, "authentication failed"),
            CredentialError::MissingToken => write!(f, "no authentication token presented"),
            CredentialError::TokenExpired => write!(f, "token has expired"),
            CredentialError::TokenInvalid => write!(f, "invalid token"),
        }
    }
}

impl StdError for CredentialError {}

/// Central error type the whole layer maps to
#[derive(Debug)]
pub enum GateError {
    Config(ConfigError),
    Credential(CredentialError),
    /// GET /me requested without an identity resolver configured;
    /// reported distinctly so operators can tell incomplete setup from a
    /// genuine auth failure
    MeEndpointNotSetup,
    /// Failure inside the application-supplied refresh token store
    Store(String),
    Internal(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::Config(e) => write!(f, "{}", e),
            GateError::Credential(e) => write!(f, "{}", e),
            GateError::MeEndpointNotSetup => {
                write!(f, "the /me endpoint requires an identity resolver")
            }
            GateError::Store(msg) => write!(f, "refresh token store error: {}", msg),
            GateError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl StdError for GateError {}

impl From<ConfigError> for GateError {
    fn from(err: ConfigError) -> Self {
        GateError::Config(err)
    }
}

impl From<CredentialError> for GateError {
    fn from(err: CredentialError) -> Self {
        GateError::Credential(err)
    }
}

impl From<String> for GateError {
    fn from(msg: String) -> Self {
        GateError::Internal(msg)
    }
}

impl From<&str> for GateError {
    fn from(msg: &str) -> Self {
        GateError::Internal(msg.to_string())
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl GateError {
    fn response_parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            GateError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                e.to_string(),
            ),
            GateError::Credential(e) => {
                let code = match e {
                    CredentialError::AuthenticationFailed => "AUTHENTICATION_FAILED",
                    CredentialError::MissingToken => "MISSING_TOKEN",
                    CredentialError::TokenExpired => "TOKEN_EXPIRED",
                    CredentialError::TokenInvalid => "TOKEN_INVALID",
                };
                (StatusCode::UNAUTHORIZED, code, e.to_string())
            }
            GateError::MeEndpointNotSetup => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ME_ENDPOINT_NOT_SETUP",
                self.to_string(),
            ),
            GateError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                "refresh token store error".to_string(),
            ),
            GateError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "internal server error".to_string(),
            ),
        }
    }

    fn log(&self, request_id: &str) {
        match self {
            GateError::Credential(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            GateError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            GateError::MeEndpointNotSetup => {
                tracing::error!(request_id = request_id, "The /me endpoint is not set up");
            }
            GateError::Store(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Refresh token store error");
            }
            GateError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for GateError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log(&request_id);

        let (status, code, message) = self.response_parts();
        let body = ErrorResponse::new(request_id, message, code.to_string(), status.as_u16());

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.response_parts().0
    }
}
