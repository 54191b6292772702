//! Drop-in token authentication layer for actix-web services.
//!
//! A host application supplies a credential-check hook (and, optionally,
//! an identity resolver and a refresh-token store) and mounts the layer's
//! endpoints: authenticate, me, verify, refresh and logout. Access tokens
//! are short-lived signed JWTs, stateless by design; refresh tokens are
//! opaque values whose validity is corroborated against the application's
//! store. Tokens travel in the Authorization header by default, or in
//! http-only cookies when cookie delivery is enabled.
//!
//! ```ignore
//! let auth = Auth::initialize(
//!     AuthSettings::new(secret),
//!     AuthHooks::new(Arc::new(MyCredentialCheck)),
//! )?;
//!
//! HttpServer::new(move || {
//!     App::new().configure(|cfg| authgate::attach(cfg, auth.clone()))
//! })
//! ```

pub mod claims;
pub mod configuration;
pub mod error;
pub mod flow;
pub mod hooks;
pub mod middleware;
pub mod routes;
pub mod store;
pub mod telemetry;
pub mod token;
pub mod verifier;

pub use claims::{Claims, ClaimsBuilder, ExtraClaims};
pub use configuration::{get_configuration, AuthSettings};
pub use error::{ConfigError, CredentialError, ErrorResponse, GateError};
pub use flow::{Auth, LogoutOutcome, MeView, TokenBundle};
pub use hooks::{AuthHooks, CredentialCheck, Identity, IdentityResolver};
pub use middleware::Protected;
pub use routes::attach;
pub use store::{InMemoryRefreshTokenStore, RefreshTokenStore};
pub use token::TokenIssuer;
pub use verifier::{TokenVerifier, Verification};
