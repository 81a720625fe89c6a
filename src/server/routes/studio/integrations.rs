//! Facebook Messenger integration and the OAuth callback that feeds it.

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use botstudio_dynconf::SettingKey;
use minijinja::context;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::warn;

use super::StudioPage;
use crate::error::{ApiError, ConsoleError};
use crate::server::guards::LoggedIn;
use crate::server::render::{encode_segment, page};
use crate::server::routes::absolute_uri;
use crate::server::router::AppState;
use crate::server::session::FlashLevel;
use crate::services::studio;

const FACEBOOK_ACTIONS: &[&str] = &["connect", "page", "disconnect"];

async fn facebook_enabled(state: &AppState) -> bool {
    state.settings.flag(SettingKey::FacebookIntegration).await
}

pub async fn show(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let mut studio_page = StudioPage::load(&state, &user, &mut session, &aiid).await?;
    studio_page.chatable = false;
    let enabled = facebook_enabled(&state).await;
    let warning = state.settings.text(SettingKey::FacebookWarning).await;

    let mut integration = Value::Null;
    let mut customisations = Value::Null;
    if enabled {
        integration = studio::get_facebook_connect_state(&state.api, &user.token, &aiid)
            .await?
            .body;
        let integrated = match integration.get("page_integrated_id") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(id)) => !id.is_empty(),
            Some(_) => true,
        };
        if integrated {
            customisations = studio::get_facebook_customisations(&state.api, &user.token, &aiid)
                .await?
                .body;
        }
    }

    page(
        session,
        "integration.html",
        context! {
            facebook_enabled => enabled,
            facebook_warning => warning,
            integration => integration,
            customisations => customisations,
            ..studio_page.context()
        },
    )
}

/// Page route named by an OAuth `state` document.
fn route_for(name: &str, args: &Map<String, Value>) -> Option<String> {
    let arg = |key: &str| -> Option<String> {
        match args.get(key)? {
            Value::String(s) if !s.is_empty() => Some(encode_segment(s)),
            _ => None,
        }
    };
    match name {
        "studio:facebook_actions" => Some(format!(
            "/bots/edit/{}/integrations/facebook/{}",
            arg("aiid")?,
            arg("action")?
        )),
        "studio:integrations" => Some(format!("/bots/edit/{}/integrations", arg("aiid")?)),
        "studio:summary" => Some("/summary".to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct OAuthQuery {
    state: Option<String>,
}

/// OAuth callback: the provider sends the browser back here with `state` naming where to go.
pub async fn oauth(
    Query(query): Query<OAuthQuery>,
    RawQuery(raw): RawQuery,
    LoggedIn { session, .. }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let raw_state = query
        .state
        .ok_or_else(|| ConsoleError::BadRequest("missing OAuth state".to_string()))?;
    let mut args: Map<String, Value> = serde_json::from_str(&raw_state)
        .map_err(|e| ConsoleError::BadRequest(format!("malformed OAuth state: {e}")))?;
    let next = match args.remove("next") {
        Some(Value::String(next)) => next,
        _ => return Err(ConsoleError::BadRequest("OAuth state names no route".to_string())),
    };
    let target = route_for(&next, &args).ok_or_else(|| {
        warn!(route = %next, "OAuth state names an unknown route");
        ConsoleError::BadRequest(format!("unknown route {next}"))
    })?;
    Ok(session.redirect(&format!("{target}?{}", raw.unwrap_or_default())))
}

#[derive(Debug, Deserialize)]
pub struct FacebookActionQuery {
    code: Option<String>,
    id: Option<String>,
}

pub async fn facebook_action(
    State(state): State<AppState>,
    Path((aiid, action)): Path<(String, String)>,
    Query(query): Query<FacebookActionQuery>,
    headers: HeaderMap,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    if !facebook_enabled(&state).await || !FACEBOOK_ACTIONS.contains(&action.as_str()) {
        return Err(ConsoleError::NotFound);
    }

    let resp = if action == "connect" {
        let payload = json!({
            "connect_token": query.code.unwrap_or_default(),
            "redirect_uri": absolute_uri(&headers, "/oauth"),
        });
        studio::post_facebook_connect_token(&state.api, &user.token, &aiid, payload).await?
    } else {
        studio::put_facebook_action(
            &state.api,
            &user.token,
            &aiid,
            &action,
            query.id.as_deref().unwrap_or_default(),
        )
        .await?
    };

    let level = if resp.status.code == 200 {
        FlashLevel::Success
    } else {
        FlashLevel::Error
    };
    session.flash(level, resp.info());
    Ok(session.redirect(&format!("/bots/edit/{aiid}/integrations")))
}

/// Saves greeting and get-started customisations; answers with the upstream code and no body.
pub async fn facebook_customise(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
    body: Bytes,
) -> Result<Response, ConsoleError> {
    if !facebook_enabled(&state).await {
        return Err(ConsoleError::NotFound);
    }
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ConsoleError::BadRequest(format!("malformed customisations: {e}")))?;

    let status = match studio::post_facebook_customisations(&state.api, &user.token, &aiid, payload)
        .await
    {
        Ok(resp) => StatusCode::from_u16(resp.status.code).unwrap_or(StatusCode::BAD_REQUEST),
        Err(ApiError::Format(_)) => StatusCode::BAD_REQUEST,
        Err(e) => return Err(e.into()),
    };
    Ok(session.respond(status.into_response()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn oauth_state_resolves_facebook_action() {
        let route = route_for(
            "studio:facebook_actions",
            &args(json!({"aiid": "abc", "action": "connect"})),
        );
        assert_eq!(
            route.as_deref(),
            Some("/bots/edit/abc/integrations/facebook/connect")
        );
    }

    #[test]
    fn oauth_state_needs_known_route_and_args() {
        assert_eq!(route_for("admin:index", &Map::new()), None);
        assert_eq!(
            route_for("studio:integrations", &args(json!({"aiid": 7}))),
            None
        );
        assert_eq!(route_for("studio:summary", &Map::new()).as_deref(), Some("/summary"));
    }
}
