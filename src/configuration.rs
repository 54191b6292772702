use config::ConfigError;

/// Authentication layer settings
///
/// Every field except `secret` has a default, so the struct can be built
/// from a literal in code or deserialized from a configuration file.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct AuthSettings {
    /// Path prefix the auth endpoints are mounted under
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// HS256 signing secret. Empty secrets are rejected at initialization.
    pub secret: String,
    /// Access token lifetime in seconds (e.g., 1800 for 30 minutes)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
    /// Enables the refresh-token feature; requires a store and an
    /// identity resolver to be supplied together
    #[serde(default)]
    pub refresh_token_enabled: bool,
    /// JSON field name the access token is delivered under
    #[serde(default = "default_access_token_name")]
    pub access_token_name: String,
    /// JSON field name the refresh token is delivered and presented under
    #[serde(default = "default_refresh_token_name")]
    pub refresh_token_name: String,
    /// When true, tokens are additionally delivered as http-only cookies
    /// and read back from them instead of the Authorization header
    #[serde(default)]
    pub cookie_set: bool,
    /// Domain attribute for token cookies; empty leaves it unset
    #[serde(default)]
    pub cookie_domain: String,
    #[serde(default = "default_true")]
    pub cookie_httponly: bool,
    #[serde(default = "default_access_token_name")]
    pub cookie_token_name: String,
    #[serde(default = "default_refresh_token_name")]
    pub cookie_refresh_token_name: String,
}

fn default_url_prefix() -> String {
    "/auth".to_string()
}

fn default_access_token_expiry() -> i64 {
    1800
}

fn default_access_token_name() -> String {
    "access_token".to_string()
}

fn default_refresh_token_name() -> String {
    "refresh_token".to_string()
}

fn default_true() -> bool {
    true
}

impl AuthSettings {
    /// Settings with defaults for the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            url_prefix: default_url_prefix(),
            secret: secret.into(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_enabled: false,
            access_token_name: default_access_token_name(),
            refresh_token_name: default_refresh_token_name(),
            cookie_set: false,
            cookie_domain: String::new(),
            cookie_httponly: true,
            cookie_token_name: default_access_token_name(),
            cookie_refresh_token_name: default_refresh_token_name(),
        }
    }
}

pub fn get_configuration() -> Result<AuthSettings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("authgate").required(false))
        .build()?;
    settings.try_deserialize::<AuthSettings>()
}
