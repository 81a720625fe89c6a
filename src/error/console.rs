use axum::{
    Json,
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use botstudio_dynconf::SettingsError;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error as ThisError;
use tracing::error;

use super::api::ApiError;
use crate::server::render;

#[derive(Debug, ThisError)]
pub enum ConsoleError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Page not found")]
    NotFound,

    /// Malformed request body (bad multipart, oversized upload, ...).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or wrong admin key.
    #[error("Unauthorized")]
    Unauthorized,

    /// No authenticated session; `next` is where to return after login.
    #[error("Requires authentication")]
    LoginRequired { next: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ractor error: {0}")]
    Ractor(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ConsoleError {
    pub fn status(&self) -> StatusCode {
        match self {
            ConsoleError::Api(ApiError::ResourceHidden) | ConsoleError::NotFound => {
                StatusCode::NOT_FOUND
            }
            ConsoleError::LoginRequired { .. } | ConsoleError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ConsoleError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ConsoleError::Settings(SettingsError::Invalid { .. }) => StatusCode::BAD_REQUEST,
            ConsoleError::Settings(SettingsError::ReadOnly) => StatusCode::CONFLICT,
            ConsoleError::Settings(SettingsError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn login_redirect(next: &str) -> Response {
        let target = format!(
            "/accounts/login?next={}",
            url::form_urlencoded::byte_serialize(next.as_bytes()).collect::<String>()
        );
        (StatusCode::FOUND, [(LOCATION, target)]).into_response()
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        if let ConsoleError::LoginRequired { next } = &self {
            return Self::login_redirect(next);
        }
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        render::error_page(status)
    }
}

/// Standardized JSON error payload for the proxy and admin endpoints.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

/// [`ConsoleError`] rendered as JSON instead of an HTML page.
#[derive(Debug)]
pub struct JsonError(pub ConsoleError);

impl From<ConsoleError> for JsonError {
    fn from(err: ConsoleError) -> Self {
        JsonError(err)
    }
}

impl From<ApiError> for JsonError {
    fn from(err: ApiError) -> Self {
        JsonError(ConsoleError::Api(err))
    }
}

impl From<SettingsError> for JsonError {
    fn from(err: SettingsError) -> Self {
        JsonError(ConsoleError::Settings(err))
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = err.status();
        let (code, message, details) = match &err {
            ConsoleError::LoginRequired { .. } => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Requires authentication" })),
                )
                    .into_response();
            }
            ConsoleError::Api(ApiError::ResourceHidden) | ConsoleError::NotFound => {
                ("NOT_FOUND", "Resource doesn't exist.".to_string(), None)
            }
            ConsoleError::BadRequest(reason) => (
                "BAD_REQUEST",
                "Malformed request.".to_string(),
                Some(json!(reason)),
            ),
            ConsoleError::Unauthorized => (
                "UNAUTHORIZED",
                "Missing or invalid admin key.".to_string(),
                None,
            ),
            ConsoleError::Settings(SettingsError::Invalid { reason, .. }) => (
                "INVALID_SETTING",
                "Invalid setting value.".to_string(),
                Some(json!(reason)),
            ),
            ConsoleError::Settings(SettingsError::ReadOnly) => (
                "READ_ONLY",
                "Settings are served from static configuration.".to_string(),
                None,
            ),
            ConsoleError::Settings(SettingsError::Unavailable(_)) => (
                "SETTINGS_UNAVAILABLE",
                "Settings store is unavailable.".to_string(),
                None,
            ),
            ConsoleError::Api(ApiError::Format(_) | ApiError::Transport(_)) => {
                error!(error = %err, "upstream call failed");
                ("UPSTREAM_ERROR", "Upstream service error.".to_string(), None)
            }
            _ => {
                error!(error = %err, "request failed");
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred.".to_string(),
                    None,
                )
            }
        };
        let body = ApiErrorBody {
            inner: ApiErrorObject {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
