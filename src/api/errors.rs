use thiserror::Error;

/// Failures surfaced by the API client. Server-provided messages are kept
/// verbatim so the console can show them as-is.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    /// 401 from any call. There is no refresh-and-retry path.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },
    /// 2xx with `success: false`.
    #[error("Rejected: {message}")]
    Rejected { message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// The message to show the user, without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Config(message)
            | Self::Network(message)
            | Self::Timeout(message)
            | Self::Parse(message)
            | Self::Serialization(message)
            | Self::Http { message, .. }
            | Self::Unauthorized { message }
            | Self::Rejected { message } => message,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// True when the server answered and refused, as opposed to a transport failure.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Unauthorized { .. } | Self::Rejected { .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout("Request timed out. Please try again.".to_string())
        } else if err.is_builder() {
            Self::Serialization(format!("Failed to build request: {err}"))
        } else if err.is_decode() {
            Self::Parse(format!("Failed to decode response: {err}"))
        } else {
            Self::Network(format!("Unable to reach the server: {err}"))
        }
    }
}
