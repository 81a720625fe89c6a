//! AI (bot) resources as returned by the upstream API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Entry of `GET /ai` -> `ai_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSummary {
    pub aiid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Training block of a single AI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiTraining {
    /// Free-form upstream state, e.g. `AI_TRAINING_COMPLETE` or `error`.
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub progress: f64,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// `GET /ai/{aiid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ai {
    pub aiid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub voice: u8,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub personality: u8,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub default_chat_responses: Vec<String>,
    #[serde(default)]
    pub linked_bots: Vec<i64>,
    #[serde(default)]
    pub handover_reset_timeout_seconds: i64,
    #[serde(default)]
    pub error_threshold_handover: i64,
    #[serde(default)]
    pub handover_message: String,
    #[serde(default)]
    pub publishing_state: String,
    #[serde(default)]
    pub training: AiTraining,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// `GET /ui/ai/{aiid}/details`: what the bot can already answer from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiDetails {
    #[serde(default)]
    pub training_file: bool,
    #[serde(default)]
    pub skills: bool,
    #[serde(default)]
    pub intents: bool,
}

impl AiDetails {
    pub fn chatable(&self) -> bool {
        self.training_file || self.skills || self.intents
    }
}
