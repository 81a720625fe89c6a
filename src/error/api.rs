use thiserror::Error as ThisError;

/// Failures of a single upstream call.
#[derive(Debug, ThisError)]
pub enum ApiError {
    /// Upstream answered 401, 403 or 404. The three are indistinguishable on purpose.
    #[error("Resource doesn't exist")]
    ResourceHidden,

    /// Body was not JSON or lacked a usable `status` envelope.
    #[error("API response format error: {0}")]
    Format(String),

    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request path: {0}")]
    Path(String),
}

impl ApiError {
    pub fn format(reason: impl Into<String>) -> Self {
        ApiError::Format(reason.into())
    }
}
