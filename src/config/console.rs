use serde::{Deserialize, Serialize};

/// Which backend serves dynamic settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SettingsBackend {
    /// Values fixed at startup from `api.timeouts` and built-in defaults.
    #[default]
    Static,
    /// Values stored in the `dynamic_settings` table, editable through `/admin/settings`.
    Database,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingsConfig {
    /// TOML: `settings.backend`. Default: `static`.
    #[serde(default)]
    pub backend: SettingsBackend,

    /// How long a value read from the store is reused before re-reading.
    /// TOML: `settings.cache_ttl_secs`. Default: `30`.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            backend: SettingsBackend::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Form handling knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormsConfig {
    /// Separator used by multi-value "token" inputs.
    /// TOML: `forms.tokenfield_delimiter`. Default: `"\u{9D}"`.
    #[serde(default = "default_tokenfield_delimiter")]
    pub tokenfield_delimiter: String,

    /// Signup is restricted to these email domains when non-empty.
    /// TOML: `forms.whitelisted_email_domains`.
    #[serde(default)]
    pub whitelisted_email_domains: Vec<String>,

    /// Upper bound for uploaded files.
    /// TOML: `forms.max_upload_bytes`. Default: 2 MiB.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            tokenfield_delimiter: default_tokenfield_delimiter(),
            whitelisted_email_domains: Vec::new(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_tokenfield_delimiter() -> String {
    "\u{9D}".to_string()
}

fn default_max_upload_bytes() -> usize {
    2 * 1024 * 1024
}
