//! Runtime-tunable settings (upstream timeouts, Facebook switches).
//!
//! The backing [`ConfigSource`] is chosen once at startup; reads never fail; a broken store
//! degrades to the static defaults from configuration.

mod db_source;

pub use db_source::DbSource;

use botstudio_dynconf::{
    CachedSource, ConfigSource, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS, SettingKey, SettingValue,
    SettingsError, StaticSource,
};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::config::{Config, SettingsBackend};
use crate::db::DbActorHandle;

/// Timeout category of an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutKey {
    #[default]
    Default,
    Chat,
    Logs,
    Facebook,
}

impl TimeoutKey {
    pub fn setting_key(self) -> SettingKey {
        match self {
            TimeoutKey::Default => SettingKey::ApiDefaultTimeout,
            TimeoutKey::Chat => SettingKey::ApiChatTimeout,
            TimeoutKey::Logs => SettingKey::ApiLogsTimeout,
            TimeoutKey::Facebook => SettingKey::ApiFacebookTimeout,
        }
    }
}

#[derive(Clone)]
pub struct DynamicSettings {
    source: Arc<dyn ConfigSource>,
    defaults: Arc<StaticSource>,
}

impl DynamicSettings {
    pub fn new(source: Arc<dyn ConfigSource>, defaults: StaticSource) -> Self {
        Self {
            source,
            defaults: Arc::new(defaults),
        }
    }

    /// Settings that never change after startup.
    pub fn fixed(defaults: StaticSource) -> Self {
        Self::new(Arc::new(defaults.clone()), defaults)
    }

    /// Picks the backend named by `settings.backend`.
    pub fn from_config(cfg: &Config, db: &DbActorHandle) -> Self {
        let defaults = cfg.static_settings();
        match cfg.settings.backend {
            SettingsBackend::Static => {
                info!("dynamic settings: static backend");
                Self::fixed(defaults)
            }
            SettingsBackend::Database => {
                info!(
                    cache_ttl_secs = cfg.settings.cache_ttl_secs,
                    "dynamic settings: database backend"
                );
                let source = CachedSource::new(DbSource::new(db.clone()), cfg.settings.cache_ttl_secs);
                Self::new(Arc::new(source), defaults)
            }
        }
    }

    async fn resolve(&self, key: SettingKey) -> SettingValue {
        match self.source.get(key).await {
            Ok(Some(value)) => value,
            Ok(None) => self.defaults.value(key),
            Err(e) => {
                warn!(key = %key, error = %e, "settings store unavailable, using static default");
                self.defaults.value(key)
            }
        }
    }

    /// Timeout for `key`, clamped to the accepted range.
    pub async fn timeout(&self, key: TimeoutKey) -> Duration {
        let key = key.setting_key();
        let secs = match self.resolve(key).await.as_seconds() {
            Some(secs) => secs,
            None => {
                warn!(key = %key, "timeout setting is not a number, using static default");
                self.defaults
                    .value(key)
                    .as_seconds()
                    .unwrap_or(MIN_TIMEOUT_SECS)
            }
        };
        Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
    }

    /// On/off switch; anything but `"on"` reads as off.
    pub async fn flag(&self, key: SettingKey) -> bool {
        self.text(key).await == "on"
    }

    pub async fn text(&self, key: SettingKey) -> String {
        match self.resolve(key).await {
            SettingValue::Text(s) => s,
            SettingValue::Seconds(n) => n.to_string(),
        }
    }

    /// Effective value of every known setting.
    pub async fn list(&self) -> Vec<(SettingKey, SettingValue)> {
        let mut out = Vec::with_capacity(SettingKey::ALL.len());
        for key in SettingKey::ALL {
            out.push((key, self.resolve(key).await));
        }
        out
    }

    pub async fn set(&self, key: SettingKey, value: SettingValue) -> Result<(), SettingsError> {
        let value = key.validate(value)?;
        self.source.set(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct BrokenSource;

    #[async_trait]
    impl ConfigSource for BrokenSource {
        async fn get(&self, _key: SettingKey) -> Result<Option<SettingValue>, SettingsError> {
            Err(SettingsError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: SettingKey, _value: SettingValue) -> Result<(), SettingsError> {
            Err(SettingsError::Unavailable("connection refused".to_string()))
        }
    }

    struct FixedSource(SettingValue);

    #[async_trait]
    impl ConfigSource for FixedSource {
        async fn get(&self, _key: SettingKey) -> Result<Option<SettingValue>, SettingsError> {
            Ok(Some(self.0.clone()))
        }

        async fn set(&self, _key: SettingKey, _value: SettingValue) -> Result<(), SettingsError> {
            Ok(())
        }
    }

    fn defaults() -> StaticSource {
        StaticSource::new(BTreeMap::from([(
            SettingKey::ApiDefaultTimeout,
            SettingValue::Seconds(3),
        )]))
    }

    #[tokio::test]
    async fn broken_store_falls_back_to_static_defaults() {
        let settings = DynamicSettings::new(Arc::new(BrokenSource), defaults());
        assert_eq!(
            settings.timeout(TimeoutKey::Default).await,
            Duration::from_secs(3)
        );
        assert_eq!(
            settings.timeout(TimeoutKey::Chat).await,
            Duration::from_secs(8)
        );
        assert!(settings.flag(SettingKey::FacebookIntegration).await);
    }

    #[tokio::test]
    async fn stored_timeouts_are_clamped() {
        let settings =
            DynamicSettings::new(Arc::new(FixedSource(SettingValue::Seconds(600))), defaults());
        assert_eq!(
            settings.timeout(TimeoutKey::Logs).await,
            Duration::from_secs(MAX_TIMEOUT_SECS)
        );

        let settings =
            DynamicSettings::new(Arc::new(FixedSource(SettingValue::Seconds(0))), defaults());
        assert_eq!(
            settings.timeout(TimeoutKey::Logs).await,
            Duration::from_secs(MIN_TIMEOUT_SECS)
        );
    }

    #[tokio::test]
    async fn fixed_settings_reject_writes() {
        let settings = DynamicSettings::fixed(defaults());
        let err = settings
            .set(SettingKey::ApiChatTimeout, SettingValue::Seconds(10))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::ReadOnly));
    }

    #[tokio::test]
    async fn list_covers_every_key() {
        let settings = DynamicSettings::fixed(defaults());
        let listed = settings.list().await;
        assert_eq!(listed.len(), SettingKey::ALL.len());
        assert_eq!(listed[0], (SettingKey::ApiDefaultTimeout, SettingValue::Seconds(3)));
    }
}
