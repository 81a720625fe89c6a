//! Bot store listings (`/ui/botstore`, `/botstore`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreBot {
    #[serde(rename = "botId")]
    pub bot_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "longDescription")]
    pub long_description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "licenseType")]
    pub license_type: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub sample: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub classification: String,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// One row of `per_category`: a category name with its top bots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreCategory {
    pub category: String,
    #[serde(default)]
    pub bots: Vec<StoreBot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn store_bot_uses_camel_case_wire_names() {
        let bot: StoreBot = serde_json::from_value(json!({
            "botId": 7,
            "name": "Weather",
            "licenseType": "Free",
            "longDescription": "Tells the weather",
            "icon": "https://cdn.example/7.png"
        }))
        .expect("bot should deserialize");

        assert_eq!(bot.bot_id, 7);
        assert_eq!(bot.license_type, "Free");
        assert_eq!(bot.extra.get("icon"), Some(&json!("https://cdn.example/7.png")));

        let back = serde_json::to_value(&bot).expect("bot should serialize");
        assert_eq!(back["botId"], json!(7));
    }
}
