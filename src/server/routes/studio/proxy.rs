//! JSON endpoints the in-page chat and dashboards call, relayed to the upstream API.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ConsoleError, JsonError};
use crate::server::guards::{LoggedIn, LoggedInJson};
use crate::server::routes::{relay, retrain_link, saved};
use crate::server::router::AppState;
use crate::server::session::FlashLevel;
use crate::services::studio;

const TRAINING_ERROR_MESSAGE: &str =
    "Training failed. Retrain the bot to try again, or contact support if it keeps failing.";

fn json_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, JsonError> {
    serde_json::from_slice(body)
        .map_err(|e| JsonError(ConsoleError::BadRequest(format!("malformed JSON body: {e}"))))
}

/// Adds the retry hint to an AI whose training failed.
fn annotate_training_error(ai: &mut Value, aiid: &str) {
    let Some(training) = ai.get_mut("training").and_then(Value::as_object_mut) else {
        return;
    };
    if training.get("status").and_then(Value::as_str) == Some("error") {
        training.insert("message".to_string(), TRAINING_ERROR_MESSAGE.into());
        training.insert("retrain_url".to_string(), retrain_link(aiid).into());
    }
}

pub async fn ai_get(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedInJson { user, .. }: LoggedInJson,
) -> Result<Response, JsonError> {
    let mut resp = studio::get_ai(&state.api, &user.token, &aiid).await?;
    annotate_training_error(&mut resp.body, &aiid);
    Ok(relay(resp))
}

pub async fn ai_delete(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let resp = studio::delete_ai(&state.api, &user.token, &aiid).await?;
    let level = if saved(resp.status.code) {
        FlashLevel::Success
    } else {
        FlashLevel::Error
    };
    session.flash(level, resp.info());
    Ok(session.redirect("/summary"))
}

/// The bot document, pretty-printed for download.
pub async fn ai_export(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, .. }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let bot: Value = studio::get_ai_export(&state.api, &user.token, &aiid)
        .await?
        .field("bot")?;
    let pretty = serde_json::to_string_pretty(&bot)
        .map_err(|e| ConsoleError::Unexpected(format!("export serialization failed: {e}")))?;
    Ok(([(CONTENT_TYPE, "application/json")], pretty).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct ChatIdBody {
    #[serde(default, rename = "chatId")]
    chat_id: String,
}

pub async fn handover_reset(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedInJson { user, .. }: LoggedInJson,
    body: Bytes,
) -> Result<Response, JsonError> {
    let ChatIdBody { chat_id } = json_body(&body)?;
    let resp = studio::post_handover_reset(&state.api, &user.token, &aiid, &chat_id).await?;
    Ok(relay(resp))
}

pub async fn context_reset(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedInJson { user, .. }: LoggedInJson,
    body: Bytes,
) -> Result<Response, JsonError> {
    let ChatIdBody { chat_id } = json_body(&body)?;
    let resp = studio::post_context_reset(&state.api, &user.token, &aiid, &chat_id).await?;
    Ok(relay(resp))
}

pub async fn chat(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedInJson { user, .. }: LoggedInJson,
    body: Bytes,
) -> Result<Response, JsonError> {
    let params: Map<String, Value> = json_body(&body)?;
    let resp = studio::post_chat(&state.api, &user.token, &aiid, &params).await?;
    Ok(relay(resp))
}

pub async fn regenerate_webhook_secret(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, .. }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let resp = studio::post_regenerate_webhook_secret(&state.api, &user.token, &aiid).await?;
    Ok(Json(resp.body).into_response())
}
