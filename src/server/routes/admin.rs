//! Out-of-band settings administration, guarded by the admin key.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use botstudio_dynconf::{SettingKey, SettingValue};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConsoleError, JsonError};
use crate::server::guards::RequireAdminKey;
use crate::server::router::AppState;

#[derive(Debug, Serialize)]
pub struct SettingView {
    key: &'static str,
    value: SettingValue,
}

async fn settings_view(state: &AppState) -> Vec<SettingView> {
    state
        .settings
        .list()
        .await
        .into_iter()
        .map(|(key, value)| SettingView {
            key: key.as_str(),
            value,
        })
        .collect()
}

pub async fn list_settings(
    _: RequireAdminKey,
    State(state): State<AppState>,
) -> Json<Vec<SettingView>> {
    Json(settings_view(&state).await)
}

#[derive(Debug, Deserialize)]
pub struct SettingUpdate {
    value: SettingValue,
}

pub async fn update_setting(
    _: RequireAdminKey,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(update): Json<SettingUpdate>,
) -> Result<Json<SettingView>, JsonError> {
    let key = SettingKey::parse(&key).ok_or(ConsoleError::NotFound)?;
    let value = key.validate(update.value)?;
    state.settings.set(key, value.clone()).await?;
    info!(key = %key, value = %value.to_json(), "dynamic setting updated");
    Ok(Json(SettingView {
        key: key.as_str(),
        value,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/settings", get(list_settings))
        .route("/admin/settings/{key}", put(update_setting))
}
