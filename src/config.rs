//! Deployment configuration for the console: which API to talk to, whether the
//! route guard is enforced, and how long a session lives when nothing better is
//! known. All parsing here is fail-safe: a bad value falls back to the default
//! rather than switching a protection off. Configuration values are public; do
//! not store secrets here.

use std::time::Duration;
use url::Url;

/// Session lifetime used when neither the persisted record nor the token says otherwise.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 3600;
/// Default request timeout applied by the API client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Header attached to every request so the tunnelling proxy skips its interstitial page.
pub const DEFAULT_TUNNEL_HEADER: &str = "ngrok-skip-browser-warning=true";
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_SEND_OTP_PATH: &str = "/otp/resend";
pub const DEFAULT_VERIFY_OTP_PATH: &str = "/otp/verify";
pub const DEFAULT_REGISTER_PATH: &str = "/auth/register";
pub const DEFAULT_INITIATE_PATH: &str = "/auth/initiate/register";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeploymentMode {
    Development,
    Production,
}

impl DeploymentMode {
    /// Anything that is not recognisably production is treated as development.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Session-related deployment knobs shared by the store, the scheduler and the guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
    pub guard_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            guard_enabled: true,
        }
    }
}

impl SessionConfig {
    /// Builds the config from raw deployment overrides.
    #[must_use]
    pub fn from_overrides(
        mode: DeploymentMode,
        auth_protection: Option<&str>,
        ttl_seconds: Option<&str>,
    ) -> Self {
        Self {
            ttl_seconds: parse_ttl_override(ttl_seconds),
            guard_enabled: resolve_guard_toggle(mode, auth_protection),
        }
    }

    #[must_use]
    pub fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Parses the TTL override. Finite values of at least one second are floored;
/// everything else yields [`DEFAULT_SESSION_TTL_SECONDS`].
#[must_use]
pub fn parse_ttl_override(value: Option<&str>) -> u64 {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return DEFAULT_SESSION_TTL_SECONDS;
    };

    match value.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(parsed) if parsed.is_finite() && parsed >= 1.0 => parsed.floor() as u64,
        _ => DEFAULT_SESSION_TTL_SECONDS,
    }
}

/// Resolves the route-guard toggle. Unset follows the deployment mode; when set,
/// production only turns the guard off on an explicit "false", and other modes
/// only turn it on with an explicit "true".
#[must_use]
pub fn resolve_guard_toggle(mode: DeploymentMode, value: Option<&str>) -> bool {
    let Some(value) = value.map(|v| v.trim().to_lowercase()) else {
        return mode == DeploymentMode::Production;
    };

    match mode {
        DeploymentMode::Production => !matches!(value.as_str(), "false" | "0" | "off" | "no"),
        DeploymentMode::Development => matches!(value.as_str(), "true" | "1" | "on" | "yes"),
    }
}

/// Paths of the admin API endpoints used by the session core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub send_otp: String,
    pub verify_otp: String,
    pub register: String,
    pub initiate_register: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_PATH.to_string(),
            send_otp: DEFAULT_SEND_OTP_PATH.to_string(),
            verify_otp: DEFAULT_VERIFY_OTP_PATH.to_string(),
            register: DEFAULT_REGISTER_PATH.to_string(),
            initiate_register: DEFAULT_INITIATE_PATH.to_string(),
        }
    }
}

/// API client configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: Url,
    pub endpoints: Endpoints,
    pub tunnel_header: Option<(String, String)>,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Creates a config for `base_url` with default endpoints and the tunnel header.
    ///
    /// # Errors
    /// Returns an error if the URL is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            endpoints: Endpoints::default(),
            tunnel_header: parse_tunnel_header(DEFAULT_TUNNEL_HEADER),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_tunnel_header(mut self, header: Option<(String, String)>) -> Self {
        self.tunnel_header = header;
        self
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// Parses the API base URL, accepting only http and https.
///
/// # Errors
/// Returns `url::ParseError` for malformed or non-http URLs.
pub fn parse_base_url(value: &str) -> Result<Url, url::ParseError> {
    let url = Url::parse(value.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(url::ParseError::RelativeUrlWithoutBase),
    }
}

/// Parses `name=value`. Empty input disables the header.
#[must_use]
pub fn parse_tunnel_header(value: &str) -> Option<(String, String)> {
    let (name, value) = value.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
