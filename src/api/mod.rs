//! Gateway to the upstream REST API.
//!
//! Every upstream call goes through [`ApiClient`]: path templating, bearer header, timeout
//! resolution, logging and the 401/403/404 collapse live here and nowhere else.

mod client;
mod request;

pub use client::{
    ApiClient, ApiResponse, LogSeverity, UPSTREAM_BODY_PREVIEW_CHARS, severity_for, to_curl,
};
pub use request::{ApiBody, ApiRequest, UploadedFile, render_path, set_headers};
