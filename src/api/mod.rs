//! HTTP helpers for the admin API with consistent timeouts, headers and error
//! handling. Feature clients go through [`ApiClient`] so every call attaches the
//! tunnel header, applies the same timeout, and parses the same
//! `{success, message, data}` envelope. The client never logs bodies; callers
//! pass secrets in request payloads and must not log them either.

mod errors;

pub use errors::ApiError;

use crate::{
    config::ApiConfig,
    session::{expiry, now_millis, SessionStore},
    APP_USER_AGENT,
};
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

/// Whether a request carries the session's bearer token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    Bearer,
    /// Pre-authentication calls: OTP send/verify, login, register.
    NoAuth,
}

/// Response envelope used by every admin API endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    fn empty() -> Self {
        Self {
            success: None,
            message: None,
            data: None,
        }
    }

    /// Server message, if it sent a non-blank one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

/// JSON client for the admin API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    session: Option<SessionStore>,
}

impl ApiClient {
    /// Builds a client with the configured timeout and user agent.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the underlying HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApiError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            config,
            session: None,
        })
    }

    /// Attaches the session store used as the bearer token source.
    #[must_use]
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Posts JSON and parses the envelope.
    ///
    /// # Errors
    /// Returns an `ApiError` for transport failures, non-2xx responses,
    /// `success: false` envelopes, and undecodable bodies.
    #[instrument(skip(self, body))]
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        auth: AuthMode,
    ) -> Result<ApiEnvelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|err| ApiError::Serialization(format!("Failed to encode request: {err}")))?;
        let response = self
            .request(Method::POST, path, auth)?
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        handle_response(response).await
    }

    /// Fetches JSON and parses the envelope.
    ///
    /// # Errors
    /// Same as [`ApiClient::post_json`].
    #[instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: AuthMode,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let response = self.request(Method::GET, path, auth)?.send().await?;
        handle_response(response).await
    }

    fn request(&self, method: Method, path: &str, auth: AuthMode) -> Result<RequestBuilder, ApiError> {
        let url = build_url(&self.config.base_url, path)?;
        let mut builder = self.http.request(method, url);

        if let Some((name, value)) = &self.config.tunnel_header {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if auth == AuthMode::Bearer {
            match self.bearer_token() {
                Some(token) => builder = builder.bearer_auth(token),
                None => debug!("no live session token; sending request without Authorization"),
            }
        }

        Ok(builder)
    }

    /// Token of the current session, unless it has expired.
    fn bearer_token(&self) -> Option<String> {
        let store = self.session.as_ref()?;
        let session = store.get()?;
        expiry::is_valid(Some(&session), store.config().ttl_seconds, now_millis())
            .then_some(session.token)
    }
}

/// Joins `path` onto the base URL, keeping any path prefix the base carries.
/// Absolute http(s) paths are used as-is.
///
/// # Errors
/// Returns `ApiError::Config` when the result is not a valid URL.
pub fn build_url(base_url: &Url, path: &str) -> Result<Url, ApiError> {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path).map_err(|err| ApiError::Config(format!("Invalid URL {path}: {err}")));
    }

    let base = base_url.as_str().trim_end_matches('/');
    let joined = format!("{}/{}", base, path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|err| ApiError::Config(format!("Invalid URL {joined}: {err}")))
}

/// Maps a response onto the envelope, surfacing server messages verbatim.
async fn handle_response<T: DeserializeOwned>(
    response: Response,
) -> Result<ApiEnvelope<T>, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        let body = response.text().await.unwrap_or_default();
        let message = json_message(body.as_bytes()).unwrap_or_else(|| sanitize_body(&body, "Unauthorized"));
        return Err(ApiError::Unauthorized { message });
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));

    if is_json {
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let message = json_message(&bytes)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Request failed".to_string());
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::Parse(format!("Failed to decode response: {err}")))?;
        if envelope.success == Some(false) {
            let message = envelope.message().unwrap_or("Request failed").to_string();
            return Err(ApiError::Rejected { message });
        }
        return Ok(envelope);
    }

    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        let fallback = status.canonical_reason().unwrap_or("Request failed");
        return Err(ApiError::Http {
            status: status.as_u16(),
            message: sanitize_body(&body, fallback),
        });
    }

    if body.trim().is_empty() {
        Ok(ApiEnvelope::empty())
    } else {
        Err(ApiError::Parse("Expected a JSON response".to_string()))
    }
}

/// Extracts a non-blank `message` field from a JSON body.
fn json_message(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<Value>(bytes)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

/// Sanitizes HTTP error bodies for user-facing messages by trimming and truncating.
fn sanitize_body(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
