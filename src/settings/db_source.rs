use async_trait::async_trait;
use botstudio_dynconf::{ConfigSource, SettingKey, SettingValue, SettingsError};
use tracing::warn;

use crate::db::DbActorHandle;

/// Settings persisted in the `dynamic_settings` table.
pub struct DbSource {
    db: DbActorHandle,
}

impl DbSource {
    pub fn new(db: DbActorHandle) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfigSource for DbSource {
    async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>, SettingsError> {
        let raw = self
            .db
            .get_setting(key.as_str())
            .await
            .map_err(|e| SettingsError::Unavailable(e.to_string()))?;

        Ok(raw.and_then(|raw| {
            let parsed = SettingValue::from_json(&raw);
            if parsed.is_none() {
                warn!(key = %key, raw = %raw, "ignoring unparsable stored setting");
            }
            parsed
        }))
    }

    async fn set(&self, key: SettingKey, value: SettingValue) -> Result<(), SettingsError> {
        self.db
            .set_setting(key.as_str(), value.to_json())
            .await
            .map_err(|e| SettingsError::Unavailable(e.to_string()))
    }
}
