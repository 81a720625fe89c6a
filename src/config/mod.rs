mod api;
mod basic;
mod console;

pub use api::{ApiConfig, TimeoutDefaults};
pub use basic::BasicConfig;
pub use console::{FormsConfig, SettingsBackend, SettingsConfig};

use botstudio_dynconf::{SettingKey, SettingValue, StaticSource};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Upstream API settings (see `api` table in config.toml).
    #[serde(default)]
    pub api: ApiConfig,

    /// Dynamic settings backend (see `settings` table in config.toml).
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Form handling (see `forms` table in config.toml).
    #[serde(default)]
    pub forms: FormsConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "BOTSTUDIO_";

impl Config {
    /// Builds a Figment that merges defaults, a config TOML file and `BOTSTUDIO_*` env vars.
    ///
    /// Nested keys use `__` in env names, e.g. `BOTSTUDIO_API__ADMIN_TOKEN`.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration by merging defaults, `config.toml` if present, and the environment.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml + env): {err}")
        })
    }

    /// Static values handed to the dynamic settings layer.
    pub fn static_settings(&self) -> StaticSource {
        let t = &self.api.timeouts;
        let values = BTreeMap::from([
            (SettingKey::ApiDefaultTimeout, SettingValue::Seconds(t.default)),
            (SettingKey::ApiChatTimeout, SettingValue::Seconds(t.chat)),
            (SettingKey::ApiLogsTimeout, SettingValue::Seconds(t.logs)),
            (SettingKey::ApiFacebookTimeout, SettingValue::Seconds(t.facebook)),
        ]);
        StaticSource::new(values)
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_optional_toml);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.basic.listen_port, 8000);
        assert_eq!(cfg.api.timeouts.default, 2);
        assert_eq!(cfg.api.timeouts.chat, 8);
        assert_eq!(cfg.settings.backend, SettingsBackend::Static);
        assert_eq!(cfg.forms.tokenfield_delimiter, "\u{9D}");
    }

    #[test]
    fn static_settings_carry_configured_timeouts() {
        let mut cfg = Config::default();
        cfg.api.timeouts.logs = 30;
        let source = cfg.static_settings();
        assert_eq!(
            source.value(SettingKey::ApiLogsTimeout),
            SettingValue::Seconds(30)
        );
        assert_eq!(
            source.value(SettingKey::FacebookIntegration),
            SettingValue::Text("on".to_string())
        );
    }

    #[test]
    fn toml_overrides_defaults() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [api]
                url = "https://api.example.test/v1"
                admin_token = "admin"

                [settings]
                backend = "database"
                "#,
            ))
            .extract()
            .expect("config should extract");

        assert_eq!(cfg.api.url.as_str(), "https://api.example.test/v1");
        assert_eq!(cfg.api.admin_token, "admin");
        assert_eq!(cfg.settings.backend, SettingsBackend::Database);
        assert_eq!(cfg.settings.cache_ttl_secs, 30);
    }
}
