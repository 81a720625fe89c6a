use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `8000`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Database URL for SQLite (local accounts and dynamic settings).
    /// TOML: `basic.database_url`. Default: `sqlite://botstudio.db`.
    #[serde(default)]
    pub database_url: String,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default)]
    pub loglevel: String,

    /// Debug mode: logs curl reproductions of upstream calls and skips TLS verification.
    /// TOML: `basic.debug`. Default: `false`.
    #[serde(default)]
    pub debug: bool,

    /// Key material for the encrypted session cookie, at least 64 bytes.
    /// TOML: `basic.secret_key`. When empty a random key is generated per process.
    #[serde(default)]
    pub secret_key: String,

    /// Key guarding the `/admin` settings endpoints.
    /// TOML: `basic.admin_key`. Empty disables the admin surface.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub admin_key: String,

    /// Marks the session cookie `Secure`. Disable only for plain-HTTP local development.
    /// TOML: `basic.secure_cookie`. Default: `true`.
    #[serde(default = "default_secure_cookie")]
    pub secure_cookie: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            database_url: "sqlite://botstudio.db".to_string(),
            loglevel: "info".to_string(),
            debug: false,
            secret_key: String::new(),
            admin_key: String::new(),
            secure_cookie: default_secure_cookie(),
        }
    }
}

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for basic.admin_key",
        )),
    }
}

/// Default IP address for the HTTP server listen address.
fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

/// Default port for the HTTP server.
fn default_listen_port() -> u16 {
    8000
}

fn default_secure_cookie() -> bool {
    true
}
