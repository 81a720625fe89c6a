use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

use crate::key::{SettingKey, SettingValue};

#[derive(Debug, ThisError)]
pub enum SettingsError {
    /// The backing store could not be reached or answered with an error.
    #[error("settings store unavailable: {0}")]
    Unavailable(String),

    #[error("settings source is read-only")]
    ReadOnly,

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: SettingKey, reason: String },
}

/// Capability to read (and optionally write) dynamic settings.
///
/// `get` returning `Ok(None)` means "not overridden"; callers fall back to the static default.
#[async_trait]
pub trait ConfigSource: Send + Sync + 'static {
    async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>, SettingsError>;

    async fn set(&self, key: SettingKey, value: SettingValue) -> Result<(), SettingsError>;
}

/// Fixed values decided at startup.
#[derive(Debug, Clone)]
pub struct StaticSource {
    values: BTreeMap<SettingKey, SettingValue>,
}

impl StaticSource {
    pub fn new(values: BTreeMap<SettingKey, SettingValue>) -> Self {
        Self { values }
    }

    /// Value for `key`, falling back to the built-in default.
    pub fn value(&self, key: SettingKey) -> SettingValue {
        self.values
            .get(&key)
            .cloned()
            .unwrap_or_else(|| key.builtin_default())
    }
}

impl Default for StaticSource {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>, SettingsError> {
        Ok(Some(self.value(key)))
    }

    async fn set(&self, _key: SettingKey, _value: SettingValue) -> Result<(), SettingsError> {
        Err(SettingsError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_prefers_configured_values() {
        let mut values = BTreeMap::new();
        values.insert(SettingKey::ApiDefaultTimeout, SettingValue::Seconds(5));
        let source = StaticSource::new(values);

        assert_eq!(
            source.get(SettingKey::ApiDefaultTimeout).await.unwrap(),
            Some(SettingValue::Seconds(5))
        );
        assert_eq!(
            source.get(SettingKey::ApiLogsTimeout).await.unwrap(),
            Some(SettingValue::Seconds(20))
        );
    }

    #[tokio::test]
    async fn static_source_rejects_writes() {
        let source = StaticSource::default();
        let err = source
            .set(SettingKey::ApiChatTimeout, SettingValue::Seconds(10))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::ReadOnly));
    }
}
