use crate::error::{ConsoleError, JsonError};
use crate::server::router::AppState;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use subtle::ConstantTimeEq;

fn extract_header_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(k) = headers.get("x-admin-key").and_then(|v| v.to_str().ok()) {
        return Some(k.to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Guards `/admin`: `Authorization: Bearer <key>` or `x-admin-key: <key>`.
///
/// An empty `basic.admin_key` rejects every caller.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdminKey;

impl FromRequestParts<AppState> for RequireAdminKey {
    type Rejection = JsonError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.config.basic.admin_key.as_bytes();
        match extract_header_token(&parts.headers) {
            Some(key) if !expected.is_empty() && bool::from(key.as_bytes().ct_eq(expected)) => {
                Ok(RequireAdminKey)
            }
            _ => Err(JsonError(ConsoleError::Unauthorized)),
        }
    }
}
