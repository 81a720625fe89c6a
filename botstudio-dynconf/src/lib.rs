pub mod cached;
pub mod key;
pub mod source;

pub use cached::CachedSource;
pub use key::{MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS, SettingKey, SettingValue};
pub use source::{ConfigSource, SettingsError, StaticSource};
