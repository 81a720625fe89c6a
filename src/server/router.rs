use crate::api::ApiClient;
use crate::config::Config;
use crate::db::DbActorHandle;
use crate::server::render::error_page;
use crate::server::routes::{admin, botstore, studio, users};
use crate::settings::DynamicSettings;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
};
use axum_extra::extract::cookie::Key;
use base64::Engine as _;
use rand::RngCore;
use reqwest::header::HeaderValue;
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
/// Room for the non-file fields of a multipart upload.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub settings: DynamicSettings,
    pub db: DbActorHandle,
    pub config: Arc<Config>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(
        api: ApiClient,
        settings: DynamicSettings,
        db: DbActorHandle,
        config: Arc<Config>,
    ) -> Self {
        let cookie_key = match Key::try_from(config.basic.secret_key.as_bytes()) {
            Ok(key) => key,
            Err(_) => {
                if !config.basic.secret_key.is_empty() {
                    warn!("basic.secret_key is shorter than 64 bytes; using a random session key");
                }
                Key::generate()
            }
        };
        Self {
            api,
            settings,
            db,
            config,
            cookie_key,
        }
    }

    /// Token separator of multi-value inputs.
    pub fn delimiter(&self) -> &str {
        &self.config.forms.tokenfield_delimiter
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

async fn not_found_handler() -> Response {
    error_page(StatusCode::NOT_FOUND)
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();
    let protocol = format_http_version(version);

    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

pub fn botstudio_router(state: AppState) -> Router {
    let body_limit = state.config.forms.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .merge(studio::router())
        .merge(botstore::router())
        .merge(users::router())
        .merge(admin::router())
        .fallback(not_found_handler)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn(access_log))
}
