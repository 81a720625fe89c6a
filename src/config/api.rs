use serde::{Deserialize, Serialize};
use url::Url;

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to.
    /// TOML: `api.url`. Env: `BOTSTUDIO_API__URL`.
    #[serde(default = "default_api_url")]
    pub url: Url,

    /// Admin token used for account bootstrap (`/admin/...`).
    /// TOML: `api.admin_token`.
    #[serde(default)]
    pub admin_token: String,

    /// Logs a preview of every upstream body. May leak sensitive data.
    /// TOML: `api.response_body_logs`. Default: `false`.
    #[serde(default)]
    pub response_body_logs: bool,

    /// Static timeout defaults, used when the dynamic store has no value or is down.
    #[serde(default)]
    pub timeouts: TimeoutDefaults,

    /// Lifetime of the token -> developer id cache used for log correlation.
    /// TOML: `api.identity_cache_ttl_secs`. Default: `3600`.
    #[serde(default = "default_identity_cache_ttl_secs")]
    pub identity_cache_ttl_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            admin_token: String::new(),
            response_body_logs: false,
            timeouts: TimeoutDefaults::default(),
            identity_cache_ttl_secs: default_identity_cache_ttl_secs(),
        }
    }
}

/// Per-category timeouts in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutDefaults {
    #[serde(default = "default_timeout")]
    pub default: u64,
    #[serde(default = "default_chat_timeout")]
    pub chat: u64,
    #[serde(default = "default_logs_timeout")]
    pub logs: u64,
    #[serde(default = "default_facebook_timeout")]
    pub facebook: u64,
}

impl Default for TimeoutDefaults {
    fn default() -> Self {
        Self {
            default: default_timeout(),
            chat: default_chat_timeout(),
            logs: default_logs_timeout(),
            facebook: default_facebook_timeout(),
        }
    }
}

fn default_api_url() -> Url {
    Url::parse("http://localhost:8080/v1").expect("static default api url must parse")
}

fn default_identity_cache_ttl_secs() -> u64 {
    3600
}

fn default_timeout() -> u64 {
    2
}

fn default_chat_timeout() -> u64 {
    8
}

fn default_logs_timeout() -> u64 {
    20
}

fn default_facebook_timeout() -> u64 {
    20
}
