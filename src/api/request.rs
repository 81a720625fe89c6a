use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::ApiError;
use crate::settings::TimeoutKey;

/// A file received from the browser, forwarded as a multipart part.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower-cased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, Default)]
pub enum ApiBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    Json(Value),
    /// Pre-serialised JSON document, sent as is.
    RawJson(Bytes),
    /// `multipart/form-data` with one file per field.
    Multipart(Vec<(String, UploadedFile)>),
}

/// One upstream call, described before any I/O happens.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: &'static str,
    pub(crate) args: Vec<(&'static str, String)>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: ApiBody,
    pub(crate) timeout_secs: u64,
    pub(crate) timeout_key: TimeoutKey,
}

impl ApiRequest {
    pub fn new(method: Method, path: &'static str) -> Self {
        Self {
            method,
            path,
            args: Vec::new(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: ApiBody::Empty,
            timeout_secs: 0,
            timeout_key: TimeoutKey::Default,
        }
    }

    pub fn get(path: &'static str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &'static str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &'static str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &'static str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Value for the `{name}` placeholder in the path template.
    pub fn arg(mut self, name: &'static str, value: impl ToString) -> Self {
        self.args.push((name, value.to_string()));
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = ApiBody::Form(pairs);
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = ApiBody::Json(value);
        self
    }

    pub fn raw_json(mut self, bytes: Bytes) -> Self {
        self.body = ApiBody::RawJson(bytes);
        self
    }

    pub fn file(mut self, field: &str, file: UploadedFile) -> Self {
        match &mut self.body {
            ApiBody::Multipart(parts) => parts.push((field.to_string(), file)),
            body => *body = ApiBody::Multipart(vec![(field.to_string(), file)]),
        }
        self
    }

    /// Explicit timeout; zero means "use the dynamic setting".
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout_key(mut self, key: TimeoutKey) -> Self {
        self.timeout_key = key;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path_template(&self) -> &'static str {
        self.path
    }

    pub fn body(&self) -> &ApiBody {
        &self.body
    }

    pub fn rendered_path(&self) -> Result<String, ApiError> {
        render_path(self.path, &self.args)
    }
}

/// Authorization headers for `token`: empty when absent or empty.
pub fn set_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(token) = token.filter(|t| !t.is_empty())
        && let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}"))
    {
        headers.insert(AUTHORIZATION, value);
    }
    headers
}

/// Substitutes `{name}` placeholders, each value percent-encoded as one path segment.
pub fn render_path(template: &str, args: &[(&str, String)]) -> Result<String, ApiError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| ApiError::Path(format!("unclosed placeholder in {template}")))?;
        let name = &after[..end];
        let value = args
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
            .ok_or_else(|| ApiError::Path(format!("no value for {{{name}}} in {template}")))?;
        out.push_str(&encode_segment(value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn encode_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_empty_without_a_token() {
        assert!(set_headers(None).is_empty());
        assert!(set_headers(Some("")).is_empty());
    }

    #[test]
    fn headers_carry_exactly_one_bearer() {
        let headers = set_headers(Some("tok-123"));
        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer tok-123")
        );
    }

    #[test]
    fn render_path_substitutes_and_encodes() {
        let path = render_path(
            "/intent/{aiid}/x/{name}",
            &[("aiid", "abc".to_string()), ("name", "a b/c".to_string())],
        )
        .unwrap();
        assert_eq!(path, "/intent/abc/x/a%20b%2Fc");
        assert_eq!(render_path("/ai", &[]).unwrap(), "/ai");
    }

    #[test]
    fn render_path_rejects_unknown_placeholders() {
        let err = render_path("/ai/{aiid}", &[("bot_id", "1".to_string())]).unwrap_err();
        assert!(matches!(err, ApiError::Path(_)));
        assert!(matches!(
            render_path("/ai/{aiid", &[]).unwrap_err(),
            ApiError::Path(_)
        ));
    }

    #[test]
    fn files_accumulate_into_one_multipart_body() {
        let file = |name: &str| UploadedFile {
            file_name: name.to_string(),
            content_type: None,
            bytes: Bytes::from_static(b"x"),
        };
        let req = ApiRequest::post("/botstore/{bot_id}/icon")
            .file("file", file("a.png"))
            .file("extra", file("b.png"));
        match req.body() {
            ApiBody::Multipart(parts) => assert_eq!(parts.len(), 2),
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(file("Icon.PNG").extension().as_deref(), Some("png"));
    }
}
