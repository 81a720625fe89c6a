use ahash::RandomState;
use async_trait::async_trait;
use moka::sync::Cache;
use std::time::Duration;

use crate::key::{SettingKey, SettingValue};
use crate::source::{ConfigSource, SettingsError};

pub type SettingsCacheStore = Cache<SettingKey, Option<SettingValue>, RandomState>;

/// Read-through cache in front of a slower source.
///
/// Misses (`None`) are cached too, so an unset key does not hit the store on every request.
/// Errors are never cached.
pub struct CachedSource<S> {
    inner: S,
    cache: SettingsCacheStore,
}

impl<S: ConfigSource> CachedSource<S> {
    pub fn new(inner: S, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs.max(1)))
            .max_capacity(SettingKey::ALL.len() as u64)
            .build_with_hasher(RandomState::new());
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl<S: ConfigSource> ConfigSource for CachedSource<S> {
    async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>, SettingsError> {
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let value = self.inner.get(key).await?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    async fn set(&self, key: SettingKey, value: SettingValue) -> Result<(), SettingsError> {
        let value = key.validate(value)?;
        self.inner.set(key, value).await?;
        self.cache.invalidate(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        reads: AtomicUsize,
        values: Mutex<BTreeMap<SettingKey, SettingValue>>,
        broken: bool,
    }

    #[async_trait]
    impl ConfigSource for CountingSource {
        async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>, SettingsError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(SettingsError::Unavailable("down".to_string()));
            }
            Ok(self.values.lock().unwrap().get(&key).cloned())
        }

        async fn set(&self, key: SettingKey, value: SettingValue) -> Result<(), SettingsError> {
            self.values.lock().unwrap().insert(key, value);
            Ok(())
        }
    }

    #[tokio::test]
    async fn repeated_reads_hit_the_cache() {
        let cached = CachedSource::new(CountingSource::default(), 60);

        assert_eq!(cached.get(SettingKey::ApiChatTimeout).await.unwrap(), None);
        assert_eq!(cached.get(SettingKey::ApiChatTimeout).await.unwrap(), None);
        assert_eq!(cached.inner().reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writes_invalidate_the_cached_entry() {
        let cached = CachedSource::new(CountingSource::default(), 60);
        let key = SettingKey::ApiDefaultTimeout;

        assert_eq!(cached.get(key).await.unwrap(), None);
        cached.set(key, SettingValue::Seconds(4)).await.unwrap();
        assert_eq!(
            cached.get(key).await.unwrap(),
            Some(SettingValue::Seconds(4))
        );
    }

    #[tokio::test]
    async fn invalid_writes_never_reach_the_store() {
        let cached = CachedSource::new(CountingSource::default(), 60);
        let err = cached
            .set(SettingKey::ApiDefaultTimeout, SettingValue::Seconds(600))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { .. }));
        assert!(cached.inner().values.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cached = CachedSource::new(
            CountingSource {
                broken: true,
                ..Default::default()
            },
            60,
        );

        assert!(cached.get(SettingKey::ApiLogsTimeout).await.is_err());
        assert!(cached.get(SettingKey::ApiLogsTimeout).await.is_err());
        assert_eq!(cached.inner().reads.load(Ordering::SeqCst), 2);
    }
}
