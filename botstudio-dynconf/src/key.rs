use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::SettingsError;

/// Lower bound for any upstream timeout, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 2;
/// Upper bound for any upstream timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 60;

/// Runtime-tunable settings administrators can change without a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    ApiDefaultTimeout,
    ApiChatTimeout,
    ApiLogsTimeout,
    ApiFacebookTimeout,
    FacebookIntegration,
    FacebookWarning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Seconds(u64),
    Text(String),
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::ApiDefaultTimeout,
        SettingKey::ApiChatTimeout,
        SettingKey::ApiLogsTimeout,
        SettingKey::ApiFacebookTimeout,
        SettingKey::FacebookIntegration,
        SettingKey::FacebookWarning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ApiDefaultTimeout => "API_DEFAULT_TIMEOUT",
            SettingKey::ApiChatTimeout => "API_CHAT_TIMEOUT",
            SettingKey::ApiLogsTimeout => "API_LOGS_TIMEOUT",
            SettingKey::ApiFacebookTimeout => "API_FACEBOOK_TIMEOUT",
            SettingKey::FacebookIntegration => "FACEBOOK_INTEGRATION",
            SettingKey::FacebookWarning => "FACEBOOK_WARNING",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SettingKey::ApiDefaultTimeout
                | SettingKey::ApiChatTimeout
                | SettingKey::ApiLogsTimeout
                | SettingKey::ApiFacebookTimeout
        )
    }

    /// Built-in value used when neither configuration nor the store provide one.
    pub fn builtin_default(&self) -> SettingValue {
        match self {
            SettingKey::ApiDefaultTimeout => SettingValue::Seconds(2),
            SettingKey::ApiChatTimeout => SettingValue::Seconds(8),
            SettingKey::ApiLogsTimeout => SettingValue::Seconds(20),
            SettingKey::ApiFacebookTimeout => SettingValue::Seconds(20),
            SettingKey::FacebookIntegration => SettingValue::Text("on".to_string()),
            SettingKey::FacebookWarning => SettingValue::Text(String::new()),
        }
    }

    /// Checks that `value` has the right shape for this key.
    pub fn validate(&self, value: SettingValue) -> Result<SettingValue, SettingsError> {
        let invalid = |reason: String| SettingsError::Invalid { key: *self, reason };
        match (self, value) {
            (k, SettingValue::Seconds(secs)) if k.is_timeout() => {
                if (MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&secs) {
                    Ok(SettingValue::Seconds(secs))
                } else {
                    Err(invalid(format!(
                        "expected {MIN_TIMEOUT_SECS}..={MAX_TIMEOUT_SECS} seconds, got {secs}"
                    )))
                }
            }
            (SettingKey::FacebookIntegration, SettingValue::Text(s)) => match s.as_str() {
                "on" | "off" => Ok(SettingValue::Text(s)),
                _ => Err(invalid(format!("expected \"on\" or \"off\", got {s:?}"))),
            },
            (SettingKey::FacebookWarning, SettingValue::Text(s)) => Ok(SettingValue::Text(s)),
            (k, _) if k.is_timeout() => Err(invalid("expected a number of seconds".to_string())),
            _ => Err(invalid("expected a string".to_string())),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SettingValue {
    pub fn as_seconds(&self) -> Option<u64> {
        match self {
            SettingValue::Seconds(s) => Some(*s),
            SettingValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s.as_str()),
            SettingValue::Seconds(_) => None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(SettingKey::parse("API_UNKNOWN"), None);
    }

    #[test]
    fn timeouts_are_bounded() {
        let key = SettingKey::ApiChatTimeout;
        assert!(key.validate(SettingValue::Seconds(8)).is_ok());
        assert!(key.validate(SettingValue::Seconds(1)).is_err());
        assert!(key.validate(SettingValue::Seconds(61)).is_err());
        assert!(key.validate(SettingValue::Text("8".to_string())).is_err());
    }

    #[test]
    fn facebook_switch_only_accepts_on_off() {
        let key = SettingKey::FacebookIntegration;
        assert!(key.validate(SettingValue::Text("off".to_string())).is_ok());
        assert!(key.validate(SettingValue::Text("maybe".to_string())).is_err());
    }

    #[test]
    fn values_serialize_as_json_scalars() {
        assert_eq!(SettingValue::Seconds(5).to_json(), "5");
        assert_eq!(
            SettingValue::from_json("\"on\""),
            Some(SettingValue::Text("on".to_string()))
        );
    }
}
