#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, Bytes, to_bytes},
    extract::State,
    http::{Method, Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use botstudio::api::ApiClient;
use botstudio::config::{Config, SettingsBackend};
use botstudio::settings::DynamicSettings;
use botstudio::{AppState, botstudio_router};
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "admin-secret";
pub const ADMIN_TOKEN: &str = "upstream-admin-token";
pub const DEV_TOKEN: &str = "dev-token-42";
pub const DEV_ID: &str = "dev-42";

/// One call the console made to the upstream API.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: Bytes,
}

type Responder = dyn Fn(&Method, &str) -> (StatusCode, Value) + Send + Sync;

#[derive(Clone)]
struct StubState {
    calls: Arc<Mutex<Vec<Recorded>>>,
    respond: Arc<Responder>,
}

/// A fake upstream API on an ephemeral port.
pub struct StubApi {
    pub url: String,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl StubApi {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&Method, &str) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            calls: calls.clone(),
            respond: Arc::new(respond),
        };
        let app = Router::new().fallback(stub_handler).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind stub upstream");
        let addr = listener.local_addr().expect("stub upstream has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub upstream died");
        });
        Self {
            url: format!("http://{addr}/v1"),
            calls,
        }
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().expect("stub lock poisoned").clone()
    }

    pub fn called(&self, method: Method, path: &str) -> bool {
        self.calls()
            .iter()
            .any(|c| c.method == method && c.path == path)
    }
}

async fn stub_handler(State(state): State<StubState>, req: Request<Body>) -> Response {
    let (parts, body) = req.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path = parts
        .uri
        .path()
        .strip_prefix("/v1")
        .unwrap_or(parts.uri.path())
        .to_string();
    let (status, value) = (state.respond)(&parts.method, &path);
    state.calls.lock().expect("stub lock poisoned").push(Recorded {
        method: parts.method,
        path,
        query: parts.uri.query().unwrap_or_default().to_string(),
        authorization: parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (status, Json(value)).into_response()
}

/// `{"status": {...}}` merged with `extra`.
pub fn envelope(code: u16, extra: Value) -> Value {
    let mut body = json!({ "status": { "code": code, "info": "OK" } });
    if let (Some(out), Value::Object(extra)) = (body.as_object_mut(), extra) {
        out.extend(extra);
    }
    body
}

/// Answers the calls every signed-in page needs; `None` falls through to `fallback`.
pub fn account_routes(method: &Method, path: &str) -> Option<(StatusCode, Value)> {
    match (method.as_str(), path) {
        ("POST", "/admin/") => Some((StatusCode::OK, envelope(200, json!({ "devid": DEV_ID })))),
        ("GET", p) if p.ends_with("/devToken/") => Some((
            StatusCode::OK,
            envelope(200, json!({ "dev_token": DEV_TOKEN })),
        )),
        _ => None,
    }
}

pub fn temp_database_url(label: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "botstudio-{label}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    format!("sqlite:{}", temp_path.display())
}

pub fn test_config(api_url: &str, label: &str) -> Config {
    let mut cfg = Config::default();
    cfg.api.url = api_url.parse().expect("stub url should parse");
    cfg.api.admin_token = ADMIN_TOKEN.to_string();
    cfg.basic.database_url = temp_database_url(label);
    cfg.basic.admin_key = ADMIN_KEY.to_string();
    cfg.basic.secure_cookie = false;
    cfg.forms.tokenfield_delimiter = ",".to_string();
    cfg
}

pub async fn build_app(cfg: Config) -> Router {
    let db = botstudio::db::spawn(&cfg.basic.database_url)
        .await
        .expect("db actor should start");
    let settings = DynamicSettings::from_config(&cfg, &db);
    let api = ApiClient::new(&cfg, settings.clone()).expect("api client should build");
    botstudio_router(AppState::new(api, settings, db, Arc::new(cfg)))
}

pub async fn app_for(stub: &StubApi, label: &str) -> Router {
    build_app(test_config(&stub.url, label)).await
}

pub async fn app_with_backend(stub: &StubApi, label: &str, backend: SettingsBackend) -> Router {
    let mut cfg = test_config(&stub.url, label);
    cfg.settings.backend = backend;
    build_app(cfg).await
}

pub async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.expect("request failed")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn post_form(uri: &str, cookie: Option<&str>, pairs: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).expect("failed to build request")
}

pub fn location(resp: &Response) -> Option<&str> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// `name=value` of the session cookie the response sets, if any.
pub fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("botstudio_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_string(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body was not utf-8")
}

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct-horse-battery";

/// Signs up a fresh developer and returns the session cookie.
pub async fn signed_in(app: &Router) -> String {
    let resp = send(
        app,
        post_form(
            "/accounts/signup",
            None,
            &[
                ("email", EMAIL),
                ("password", PASSWORD),
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
                ("agree", "on"),
            ],
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND, "signup should redirect");
    session_cookie(&resp).expect("signup should set the session cookie")
}
