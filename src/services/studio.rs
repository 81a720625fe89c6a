//! AI (bot) endpoints called with the session's bearer token.

use botstudio_schema::{AiSummary, Entity};
use bytes::Bytes;
use serde_json::{Map, Value};

use super::merge_form;
use crate::api::{ApiClient, ApiRequest, ApiResponse, UploadedFile};
use crate::error::ApiError;
use crate::settings::TimeoutKey;

const AI_DEFAULTS: [(&str, &str); 4] = [
    ("is_private", "false"),
    ("personality", "0"),
    ("confidence", "0.4"),
    ("locale", "en-US"),
];

pub async fn get_ai_list(api: &ApiClient, token: &str) -> Result<Vec<AiSummary>, ApiError> {
    api.fetch(Some(token), ApiRequest::get("/ai"))
        .await?
        .field_or_default("ai_list")
}

pub async fn get_ai(api: &ApiClient, token: &str, aiid: &str) -> Result<ApiResponse, ApiError> {
    api.fetch(Some(token), ApiRequest::get("/ai/{aiid}").arg("aiid", aiid))
        .await
}

pub async fn get_ai_details(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/ui/ai/{aiid}/details").arg("aiid", aiid),
    )
    .await
}

pub async fn delete_ai(api: &ApiClient, token: &str, aiid: &str) -> Result<ApiResponse, ApiError> {
    api.fetch(Some(token), ApiRequest::delete("/ai/{aiid}").arg("aiid", aiid))
        .await
}

pub async fn get_ai_export(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/ai/{aiid}/export").arg("aiid", aiid),
    )
    .await
}

/// Creates an AI, or updates it when `aiid` is given. Caller fields win over the defaults.
pub async fn post_ai(
    api: &ApiClient,
    token: &str,
    data: Vec<(String, String)>,
    aiid: Option<&str>,
) -> Result<ApiResponse, ApiError> {
    let form = merge_form(&AI_DEFAULTS, data);
    let request = match aiid {
        Some(aiid) => ApiRequest::post("/ai/{aiid}").arg("aiid", aiid),
        None => ApiRequest::post("/ai"),
    };
    api.fetch(Some(token), request.form(form)).await
}

pub async fn post_clone_ai(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    data: Vec<(String, String)>,
) -> Result<ApiResponse, ApiError> {
    let form = merge_form(&AI_DEFAULTS, data);
    api.fetch(
        Some(token),
        ApiRequest::post("/ai/{aiid}/clone")
            .arg("aiid", aiid)
            .form(form),
    )
    .await
}

pub async fn post_import_ai(
    api: &ApiClient,
    token: &str,
    document: Bytes,
) -> Result<ApiResponse, ApiError> {
    api.fetch(Some(token), ApiRequest::post("/ai/import").raw_json(document))
        .await
}

pub async fn post_reimport_ai(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    document: Bytes,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/ai/{aiid}/import")
            .arg("aiid", aiid)
            .raw_json(document),
    )
    .await
}

pub async fn post_ai_skill(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    skills: &[String],
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/ai/{aiid}/bots")
            .arg("aiid", aiid)
            .query("bot_list", skills.join(",")),
    )
    .await
}

pub async fn get_ai_training(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/ai/{aiid}/training").arg("aiid", aiid),
    )
    .await
}

pub async fn post_training(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    file: UploadedFile,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/ai/{aiid}/training")
            .arg("aiid", aiid)
            .query("source_type", 0)
            .file("file", file),
    )
    .await
}

pub async fn put_training_start(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::put("/ai/{aiid}/training/start").arg("aiid", aiid),
    )
    .await
}

pub async fn put_training_update(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::put("/ai/{aiid}/training/update").arg("aiid", aiid),
    )
    .await
}

pub async fn post_regenerate_webhook_secret(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/ai/{aiid}/regenerate_webhook_secret").arg("aiid", aiid),
    )
    .await
}

pub async fn get_entities_list(api: &ApiClient, token: &str) -> Result<Vec<Entity>, ApiError> {
    api.fetch(Some(token), ApiRequest::get("/entities"))
        .await?
        .field_or_default("entities")
}

pub async fn get_entity(
    api: &ApiClient,
    token: &str,
    entity_name: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/entity").query("entity_name", entity_name),
    )
    .await
}

pub async fn post_entity(
    api: &ApiClient,
    token: &str,
    entity_name: &str,
    entity_values: &[String],
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/entity")
            .query("entity_name", entity_name)
            .json(serde_json::json!({
                "entity_name": entity_name,
                "entity_values": entity_values,
            })),
    )
    .await
}

pub async fn delete_entity(
    api: &ApiClient,
    token: &str,
    entity_name: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::delete("/entity").query("entity_name", entity_name),
    )
    .await
}

/// Names of the intents defined on `aiid`.
pub async fn get_intent_list(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<Vec<String>, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/intents/{aiid}").arg("aiid", aiid),
    )
    .await?
    .field_or_default("intents")
}

pub async fn get_intent(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    intent_name: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/intent/{aiid}")
            .arg("aiid", aiid)
            .query("intent_name", intent_name),
    )
    .await
}

pub async fn post_intent(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    payload: Value,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/intent/{aiid}")
            .arg("aiid", aiid)
            .json(payload),
    )
    .await
}

pub async fn delete_intent(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    intent_name: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::delete("/intent/{aiid}")
            .arg("aiid", aiid)
            .query("intent_name", intent_name),
    )
    .await
}

pub async fn post_intents_csv(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    file: UploadedFile,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/intents/{aiid}/csv")
            .arg("aiid", aiid)
            .file("file", file),
    )
    .await
}

/// Chat logs as CSV, streamed back unparsed.
pub async fn get_insights_chatlogs(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    from: &str,
    to: &str,
) -> Result<reqwest::Response, ApiError> {
    api.fetch_raw(
        Some(token),
        ApiRequest::get("/insights/{aiid}/chatlogs")
            .arg("aiid", aiid)
            .query("format", "csv")
            .query("from", from)
            .query("to", to)
            .timeout_key(TimeoutKey::Logs),
    )
    .await
}

pub async fn get_insights_chart(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    metric: &str,
    from: &str,
    to: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/insights/{aiid}/graph/{metric}")
            .arg("aiid", aiid)
            .arg("metric", metric)
            .query("from", from)
            .query("to", to)
            .timeout_key(TimeoutKey::Logs),
    )
    .await
}

pub async fn get_facebook_connect_state(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/aiservices/{aiid}/facebook")
            .arg("aiid", aiid)
            .timeout_key(TimeoutKey::Facebook),
    )
    .await
}

pub async fn post_facebook_connect_token(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    payload: Value,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/aiservices/{aiid}/facebook")
            .arg("aiid", aiid)
            .json(payload)
            .timeout_key(TimeoutKey::Facebook),
    )
    .await
}

pub async fn put_facebook_action(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    action: &str,
    id: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::put("/aiservices/{aiid}/facebook")
            .arg("aiid", aiid)
            .query("action", action)
            .query("id", id)
            .timeout_key(TimeoutKey::Facebook),
    )
    .await
}

pub async fn get_facebook_customisations(
    api: &ApiClient,
    token: &str,
    aiid: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::get("/aiservices/{aiid}/facebook/custom")
            .arg("aiid", aiid)
            .timeout_key(TimeoutKey::Facebook),
    )
    .await
}

pub async fn post_facebook_customisations(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    payload: Value,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::put("/aiservices/{aiid}/facebook/custom")
            .arg("aiid", aiid)
            .json(payload)
            .timeout_key(TimeoutKey::Facebook),
    )
    .await
}

/// Sends a chat turn; every scalar of `params` (`q`, `chatId`, ...) becomes a query parameter.
pub async fn post_chat(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    params: &Map<String, Value>,
) -> Result<ApiResponse, ApiError> {
    let mut request = ApiRequest::get("/ai/{aiid}/chat")
        .arg("aiid", aiid)
        .timeout_key(TimeoutKey::Chat);
    for (key, value) in params {
        match value {
            Value::String(s) => request = request.query(key, s),
            Value::Number(n) => request = request.query(key, n),
            Value::Bool(b) => request = request.query(key, b),
            _ => {}
        }
    }
    api.fetch(Some(token), request).await
}

pub async fn post_handover_reset(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    chat_id: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/ai/{aiid}/chat/resetHandover")
            .arg("aiid", aiid)
            .query("chatId", chat_id)
            .timeout_key(TimeoutKey::Chat),
    )
    .await
}

pub async fn post_context_reset(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    chat_id: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/ai/{aiid}/chat/resetContext")
            .arg("aiid", aiid)
            .query("chatId", chat_id)
            .timeout_key(TimeoutKey::Chat),
    )
    .await
}
