use ahash::RandomState;
use botstudio_schema::ApiStatus;
use moka::sync::Cache;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{StatusCode, redirect};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use url::Url;

use super::request::{ApiBody, ApiRequest, set_headers};
use crate::config::Config;
use crate::error::ApiError;
use crate::settings::DynamicSettings;

/// Characters of an upstream body kept in log previews.
pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 500;

const USER_AGENT: &str = concat!("botstudio/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
    Info,
    Error,
}

/// Leading digit 2 or 3 logs at info, everything else at error.
pub fn severity_for(status: u16) -> LogSeverity {
    match status / 100 {
        2 | 3 => LogSeverity::Info,
        _ => LogSeverity::Error,
    }
}

macro_rules! log_at {
    ($severity:expr, $($arg:tt)+) => {
        match $severity {
            LogSeverity::Info => info!($($arg)+),
            LogSeverity::Error => error!($($arg)+),
        }
    };
}

/// Shell command reproducing `request`.
pub fn to_curl(request: &reqwest::Request, insecure: bool) -> String {
    let headers = request
        .headers()
        .iter()
        .map(|(k, v)| format!("--header \"{}: {}\"", k, v.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join(" ");
    let data = match request.body() {
        Some(body) => match body.as_bytes() {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => "<streamed body>".to_string(),
        },
        None => String::new(),
    };
    let mut command = format!("curl --request {}", request.method());
    if !headers.is_empty() {
        command.push(' ');
        command.push_str(&headers);
    }
    if !data.is_empty() {
        command.push_str(&format!(" --data '{}'", data.replace('\'', "'\\''")));
    }
    command.push_str(&format!(" '{}'", request.url()));
    if insecure {
        command.push_str(" --insecure");
    }
    command
}

/// Parsed upstream JSON together with its validated envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub http_status: StatusCode,
    pub status: ApiStatus,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn info(&self) -> &str {
        &self.status.info
    }

    /// Deserializes the top-level `field`; absence or a shape mismatch is a format error.
    pub fn field<T: DeserializeOwned>(&self, field: &str) -> Result<T, ApiError> {
        let value = self
            .body
            .get(field)
            .cloned()
            .ok_or_else(|| ApiError::format(format!("API response is missing `{field}`")))?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::format(format!("API response `{field}` is malformed: {e}")))
    }

    /// Like [`ApiResponse::field`], but a missing or `null` field reads as the default.
    pub fn field_or_default<T: DeserializeOwned + Default>(
        &self,
        field: &str,
    ) -> Result<T, ApiError> {
        match self.body.get(field) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(_) => self.field(field),
        }
    }

    /// The whole body as `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| ApiError::format(format!("API response is malformed: {e}")))
    }
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    settings: DynamicSettings,
    identities: Cache<String, String, RandomState>,
    debug: bool,
    response_body_logs: bool,
}

/// The single gateway to the upstream API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

impl ApiClient {
    pub fn new(cfg: &Config, settings: DynamicSettings) -> Result<Self, ApiError> {
        let debug = cfg.basic.debug;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(debug)
            .build()?;

        let identities = Cache::builder()
            .time_to_live(Duration::from_secs(cfg.api.identity_cache_ttl_secs.max(1)))
            .max_capacity(10_000)
            .build_with_hasher(RandomState::new());

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: cfg.api.url.clone(),
                settings,
                identities,
                debug,
                response_body_logs: cfg.api.response_body_logs,
            }),
        })
    }

    pub fn settings(&self) -> &DynamicSettings {
        &self.inner.settings
    }

    /// Records which developer a bearer token belongs to, for log correlation.
    pub fn remember_identity(&self, token: &str, dev_id: &str) {
        if !token.is_empty() {
            self.inner
                .identities
                .insert(token.to_string(), dev_id.to_string());
        }
    }

    pub fn identity(&self, token: Option<&str>) -> Option<String> {
        token
            .filter(|t| !t.is_empty())
            .and_then(|t| self.inner.identities.get(t))
    }

    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let path = request.rendered_path()?;
        let joined = format!(
            "{}{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            path
        );
        let mut url =
            Url::parse(&joined).map_err(|e| ApiError::Path(format!("{joined}: {e}")))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    fn build(
        &self,
        token: Option<&str>,
        request: ApiRequest,
        timeout: Duration,
    ) -> Result<reqwest::Request, ApiError> {
        let url = self.url_for(&request)?;

        let mut headers = request.headers;
        headers.extend(set_headers(token));

        let builder = self
            .inner
            .http
            .request(request.method, url)
            .timeout(timeout);

        let builder = match request.body {
            ApiBody::Empty => builder,
            ApiBody::Form(pairs) => builder.form(&pairs),
            ApiBody::Json(value) => builder.json(&value),
            ApiBody::RawJson(bytes) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(bytes),
            ApiBody::Multipart(files) => {
                let mut form = reqwest::multipart::Form::new();
                for (field, file) in files {
                    let mut part =
                        reqwest::multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
                    if let Some(ct) = file.content_type.as_deref() {
                        part = part.mime_str(ct)?;
                    }
                    form = form.part(field, part);
                }
                builder.multipart(form)
            }
        };

        Ok(builder.headers(headers).build()?)
    }

    /// Runs the shared pipeline up to and including the 401/403/404 collapse.
    async fn send(
        &self,
        token: Option<&str>,
        request: ApiRequest,
    ) -> Result<reqwest::Response, ApiError> {
        let timeout = if request.timeout_secs > 0 {
            Duration::from_secs(request.timeout_secs)
        } else {
            self.inner.settings.timeout(request.timeout_key).await
        };

        let req = self.build(token, request, timeout)?;
        let method = req.method().clone();
        let url = req.url().clone();
        let curl = self.inner.debug.then(|| to_curl(&req, self.inner.debug));
        let dev_id = self.identity(token).unwrap_or_else(|| "-".to_string());

        let start = Instant::now();
        let resp = match self.inner.http.execute(req).await {
            Ok(resp) => resp,
            Err(e) => {
                error!(
                    dev_id = %dev_id,
                    method = %method,
                    url = %url,
                    timeout_secs = timeout.as_secs(),
                    error = %e,
                    "API request failed"
                );
                return Err(ApiError::Transport(e));
            }
        };
        let elapsed = start.elapsed().as_secs_f64();
        let status = resp.status().as_u16();
        let severity = severity_for(status);

        if let Some(curl) = curl {
            log_at!(severity, "{curl}");
        }

        log_at!(
            severity,
            dev_id = %dev_id,
            method = %method,
            url = %url,
            status,
            elapsed_secs = elapsed,
            "API responded with {status} in {elapsed:.3}s for {method} request {url}"
        );
        info!(
            status,
            elapsed_secs = elapsed,
            "[METRIC][CONSOLE.API_REQUEST.RESPONSE] DURATION:{elapsed:.3} STATUS:{status}"
        );

        if matches!(
            resp.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Err(ApiError::ResourceHidden);
        }

        Ok(resp)
    }

    /// Sends `request` and returns the validated JSON body.
    pub async fn fetch(
        &self,
        token: Option<&str>,
        request: ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let resp = self.send(token, request).await?;
        let http_status = resp.status();
        let bytes = resp.bytes().await?;

        if self.inner.response_body_logs {
            let raw = String::from_utf8_lossy(&bytes);
            info!(
                status = http_status.as_u16(),
                body = %format!("{:.len$}", raw, len = UPSTREAM_BODY_PREVIEW_CHARS),
                "API response body"
            );
        }

        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|_| ApiError::format("API response should be a JSON response"))?;
        let status = ApiStatus::from_body(&body).ok_or_else(|| {
            ApiError::format("API response is missing mandatory properties status.code/status.info")
        })?;

        debug!(code = status.code, info = %status.info, "API envelope");
        Ok(ApiResponse {
            http_status,
            status,
            body,
        })
    }

    /// Sends `request` and hands back the unparsed response (CSV downloads and the like).
    pub async fn fetch_raw(
        &self,
        token: Option<&str>,
        request: ApiRequest,
    ) -> Result<reqwest::Response, ApiError> {
        let resp = self.send(token, request).await?;
        if self.inner.response_body_logs {
            info!(
                status = resp.status().as_u16(),
                content_length = resp.content_length().unwrap_or(0),
                "API raw response"
            );
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botstudio_dynconf::StaticSource;
    use serde_json::json;

    fn client(debug: bool) -> ApiClient {
        let mut cfg = Config::default();
        cfg.basic.debug = debug;
        cfg.api.url = Url::parse("http://api.example.test/v1").unwrap();
        ApiClient::new(&cfg, DynamicSettings::fixed(StaticSource::default())).unwrap()
    }

    #[test]
    fn severity_follows_status_class() {
        assert_eq!(severity_for(200), LogSeverity::Info);
        assert_eq!(severity_for(302), LogSeverity::Info);
        assert_eq!(severity_for(400), LogSeverity::Error);
        assert_eq!(severity_for(503), LogSeverity::Error);
        assert_eq!(severity_for(101), LogSeverity::Error);
    }

    #[test]
    fn url_joins_base_path_and_query() {
        let req = ApiRequest::get("/intent/{aiid}")
            .arg("aiid", "abc")
            .query("intent_name", "hello world");
        let url = client(false).url_for(&req).unwrap();
        assert_eq!(
            url.as_str(),
            "http://api.example.test/v1/intent/abc?intent_name=hello+world"
        );
    }

    #[test]
    fn curl_reproduces_method_headers_body_and_insecure_flag() {
        let api = client(true);
        let req = ApiRequest::post("/entity")
            .query("entity_name", "colour")
            .json(json!({"entity_name": "colour"}));
        let built = api
            .build(Some("tok"), req, Duration::from_secs(2))
            .unwrap();

        let curl = to_curl(&built, true);
        assert!(curl.starts_with("curl --request POST"));
        assert!(curl.contains("--header \"authorization: Bearer tok\""));
        assert!(curl.contains("--data '{\"entity_name\":\"colour\"}'"));
        assert!(curl.contains("'http://api.example.test/v1/entity?entity_name=colour'"));
        assert!(curl.ends_with("--insecure"));
    }

    #[test]
    fn bearer_overrides_caller_supplied_authorization() {
        let api = client(false);
        let req = ApiRequest::get("/ai").header(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer stale"),
        );
        let built = api.build(Some("fresh"), req, Duration::from_secs(2)).unwrap();
        let values: Vec<_> = built
            .headers()
            .get_all(reqwest::header::AUTHORIZATION)
            .iter()
            .collect();
        assert_eq!(values, vec![HeaderValue::from_static("Bearer fresh")]);
    }

    #[test]
    fn identities_are_remembered_per_token() {
        let api = client(false);
        assert_eq!(api.identity(Some("tok")), None);
        api.remember_identity("tok", "dev-1");
        assert_eq!(api.identity(Some("tok")).as_deref(), Some("dev-1"));
        assert_eq!(api.identity(None), None);
    }

    #[test]
    fn response_fields_report_format_errors() {
        let resp = ApiResponse {
            http_status: StatusCode::OK,
            status: ApiStatus {
                code: 200,
                info: "OK".to_string(),
            },
            body: json!({"ai_list": [], "status": {"code": 200, "info": "OK"}}),
        };
        let list: Vec<Value> = resp.field("ai_list").unwrap();
        assert!(list.is_empty());
        assert!(matches!(
            resp.field::<Vec<Value>>("bots").unwrap_err(),
            ApiError::Format(_)
        ));
        let missing: Vec<Value> = resp.field_or_default("bots").unwrap();
        assert!(missing.is_empty());
    }
}
