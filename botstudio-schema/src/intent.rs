//! Intent definitions (`/intent/{aiid}`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub intent_name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Entity slot attached to an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentVariable {
    pub entity_name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub n_prompts: u32,
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub lifetime_turns: i32,
    #[serde(default)]
    pub persistent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub variable: String,
    pub operator: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub intent_name: String,
    #[serde(default)]
    pub user_says: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
    #[serde(default)]
    pub variables: Vec<IntentVariable>,
    #[serde(default)]
    pub webhook: Option<Webhook>,
    #[serde(default)]
    pub context_in: BTreeMap<String, String>,
    #[serde(default)]
    pub context_out: BTreeMap<String, String>,
    #[serde(default)]
    pub conditions_in: Vec<Condition>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Intent {
    /// Endpoint shown in the edit form; an absent webhook reads as empty.
    pub fn webhook_endpoint(&self) -> &str {
        self.webhook
            .as_ref()
            .map(|w| w.endpoint.as_str())
            .unwrap_or("")
    }
}
