pub mod admin;
pub mod botstore;
pub mod studio;
pub mod users;

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::HOST},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::api::ApiResponse;

/// `?next=` on pages that send the browser somewhere else when done.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct NextQuery {
    pub next: Option<String>,
}

/// Field values a form page is rendered with.
pub(crate) type Values = BTreeMap<String, String>;

pub(crate) fn initial<const N: usize>(pairs: [(&str, String); N]) -> Values {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

pub(crate) const RETRAIN_MESSAGE: &str =
    "Your bot has changed. Retrain it so the latest changes take effect.";

pub(crate) fn retrain_link(aiid: &str) -> String {
    format!("/bots/edit/{aiid}/retrain")
}

/// Upstream saves report success as 200 or 201.
pub(crate) fn saved(code: u16) -> bool {
    matches!(code, 200 | 201)
}

/// Accepts only local absolute paths, so `next` cannot bounce to another host.
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would become
/// `//host`; any whitespace or control character is rejected outright.
pub(crate) fn safe_next(next: Option<&str>) -> Option<String> {
    next.map(str::trim)
        .filter(|n| {
            n.starts_with('/')
                && !n.starts_with("//")
                && !n.contains('\\')
                && !n.chars().any(|c| c.is_whitespace() || c.is_control())
        })
        .map(str::to_string)
}

/// Relays an upstream body, with the envelope code as the HTTP status.
pub(crate) fn relay(resp: ApiResponse) -> Response {
    let status = StatusCode::from_u16(resp.status.code).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(resp.body)).into_response()
}

/// Absolute URL of `path` on this server, as seen by the browser.
pub(crate) fn absolute_uri(headers: &HeaderMap, path: &str) -> String {
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|p| matches!(*p, "http" | "https"))
        .unwrap_or("http");
    format!("{scheme}://{host}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn next_must_stay_local() {
        assert_eq!(safe_next(Some("/summary")), Some("/summary".to_string()));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn next_rejects_smuggled_whitespace() {
        for next in ["/\t/evil.example", "/\r/evil.example", "/\n/evil.example", "/ /evil"] {
            assert_eq!(safe_next(Some(next)), None, "{next:?} should be rejected");
        }
        assert_eq!(
            safe_next(Some("  /bots/edit/abc  ")),
            Some("/bots/edit/abc".to_string())
        );
    }

    #[test]
    fn absolute_uri_honours_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("studio.example.com"));
        assert_eq!(absolute_uri(&headers, "/oauth"), "http://studio.example.com/oauth");
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(absolute_uri(&headers, "/oauth"), "https://studio.example.com/oauth");
    }
}
