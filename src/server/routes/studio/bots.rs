use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, header::REFERER},
    response::Response,
};
use botstudio_schema::Ai;
use minijinja::context;

use super::StudioPage;
use crate::api::ApiResponse;
use crate::error::ConsoleError;
use crate::forms::ai::{
    AddAiForm, CloneAiForm, ImportAiForm, PERSONALITIES, SettingsAiForm, SkillsForm, TIMEZONES,
    TrainingForm, VOICES,
};
use crate::forms::{FormErrors, join_tokens};
use crate::server::extract::FormInput;
use crate::server::guards::LoggedIn;
use crate::server::render::{found, page};
use crate::server::routes::{NextQuery, Values, initial, safe_next, saved};
use crate::server::router::AppState;
use crate::server::session::{FlashLevel, SessionJar, SessionUser};
use crate::services::{botstore, studio};

pub async fn home() -> Response {
    found("/summary")
}

pub async fn summary(
    State(state): State<AppState>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let ais = studio::get_ai_list(&state.api, &user.token).await?;
    if ais.is_empty() {
        return page(session, "welcome.html", context! {});
    }
    page(session, "ai_list.html", context! { ais => ais })
}

pub async fn wizard(LoggedIn { session, .. }: LoggedIn) -> Result<Response, ConsoleError> {
    page(session, "ai_wizard.html", context! {})
}

struct AiFormPage<'a> {
    title: &'a str,
    action: String,
    values: Values,
    errors: FormErrors,
}

fn ai_form_page(
    session: SessionJar,
    state: &AppState,
    form: AiFormPage<'_>,
) -> Result<Response, ConsoleError> {
    page(
        session,
        "ai_form.html",
        context! {
            title => form.title,
            action => form.action,
            values => form.values,
            errors => form.errors,
            voices => VOICES,
            timezones => TIMEZONES,
            delimiter => state.delimiter(),
        },
    )
}

fn form_action(path: &str, next: Option<&str>) -> String {
    match safe_next(next) {
        Some(next) => format!(
            "{path}?next={}",
            url::form_urlencoded::byte_serialize(next.as_bytes()).collect::<String>()
        ),
        None => path.to_string(),
    }
}

/// Where a freshly created bot lands: `next` if given, else its dashboard.
fn created_target(resp: &ApiResponse, next: Option<&str>, fallback_aiid: Option<&str>) -> String {
    if let Some(next) = safe_next(next) {
        return next;
    }
    match resp.field::<String>("aiid").ok().as_deref().or(fallback_aiid) {
        Some(aiid) => format!("/bots/dashboard/{aiid}"),
        None => "/summary".to_string(),
    }
}

pub async fn add_form(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    LoggedIn { session, .. }: LoggedIn,
) -> Result<Response, ConsoleError> {
    ai_form_page(
        session,
        &state,
        AiFormPage {
            title: "Create a new bot",
            action: form_action("/bots/add", query.next.as_deref()),
            values: initial([("voice", "0".to_string()), ("timezone", "UTC".to_string())]),
            errors: FormErrors::default(),
        },
    )
}

pub async fn add_submit(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let rerender = |session: SessionJar, errors: FormErrors| {
        ai_form_page(
            session,
            &state,
            AiFormPage {
                title: "Create a new bot",
                action: form_action("/bots/add", query.next.as_deref()),
                values: data.values(),
                errors,
            },
        )
    };

    let form = match AddAiForm::parse(&data, state.delimiter()) {
        Ok(form) => form,
        Err(errors) => return rerender(session, errors),
    };

    let resp = studio::post_ai(&state.api, &user.token, form.to_form(), None).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        let target = created_target(&resp, query.next.as_deref(), None);
        return Ok(session.redirect(&target));
    }
    session.flash(FlashLevel::Error, resp.info());
    rerender(session, FormErrors::default())
}

pub async fn clone_form(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let ai: Ai = studio::get_ai(&state.api, &user.token, &aiid).await?.parse()?;
    ai_form_page(
        session,
        &state,
        AiFormPage {
            title: "Clone bot",
            action: form_action(&format!("/bots/clone/{aiid}"), query.next.as_deref()),
            values: initial([
                ("name", format!("Copy of {}", ai.name)),
                ("description", ai.description),
                ("voice", ai.voice.to_string()),
                ("timezone", ai.timezone),
                (
                    "default_chat_responses",
                    join_tokens(&ai.default_chat_responses, state.delimiter()),
                ),
            ]),
            errors: FormErrors::default(),
        },
    )
}

pub async fn clone_submit(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let action = form_action(&format!("/bots/clone/{aiid}"), query.next.as_deref());
    let rerender = |session: SessionJar, errors: FormErrors| {
        ai_form_page(
            session,
            &state,
            AiFormPage {
                title: "Clone bot",
                action: action.clone(),
                values: data.values(),
                errors,
            },
        )
    };

    let form = match CloneAiForm::parse(&data, state.delimiter()) {
        Ok(form) => form,
        Err(errors) => return rerender(session, errors),
    };

    let resp = studio::post_clone_ai(&state.api, &user.token, &aiid, form.to_form()).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        let target = created_target(&resp, query.next.as_deref(), None);
        return Ok(session.redirect(&target));
    }
    session.flash(FlashLevel::Error, resp.info());
    rerender(session, FormErrors::default())
}

fn import_page(
    session: SessionJar,
    action: &str,
    aiid: Option<&str>,
    errors: FormErrors,
) -> Result<Response, ConsoleError> {
    page(
        session,
        "ai_import.html",
        context! {
            action => action,
            aiid => aiid,
            field => ImportAiForm::FIELD,
            errors => errors,
        },
    )
}

pub async fn import_form(LoggedIn { session, .. }: LoggedIn) -> Result<Response, ConsoleError> {
    import_page(session, "/bots/import", None, FormErrors::default())
}

pub async fn import_submit(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let form = match ImportAiForm::parse(&data) {
        Ok(form) => form,
        Err(errors) => return import_page(session, "/bots/import", None, errors),
    };

    let resp = studio::post_import_ai(&state.api, &user.token, form.document).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        let target = created_target(&resp, query.next.as_deref(), None);
        return Ok(session.redirect(&target));
    }
    session.flash(FlashLevel::Error, resp.info());
    import_page(session, "/bots/import", None, FormErrors::default())
}

pub async fn reimport_form(
    Path(aiid): Path<String>,
    LoggedIn { session, .. }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let action = format!("/bots/edit/{aiid}/import");
    import_page(session, &action, Some(&aiid), FormErrors::default())
}

pub async fn reimport_submit(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let action = format!("/bots/edit/{aiid}/import");
    let form = match ImportAiForm::parse(&data) {
        Ok(form) => form,
        Err(errors) => return import_page(session, &action, Some(&aiid), errors),
    };

    let resp = studio::post_reimport_ai(&state.api, &user.token, &aiid, form.document).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        let target = created_target(&resp, query.next.as_deref(), Some(&aiid));
        return Ok(session.redirect(&target));
    }
    session.flash(FlashLevel::Error, resp.info());
    import_page(session, &action, Some(&aiid), FormErrors::default())
}

pub async fn detail(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let studio_page = StudioPage::load(&state, &user, &mut session, &aiid).await?;
    page(session, "ai_detail.html", studio_page.context())
}

async fn settings_page(
    state: &AppState,
    user: &SessionUser,
    mut session: SessionJar,
    aiid: &str,
    values: Option<Values>,
    errors: FormErrors,
) -> Result<Response, ConsoleError> {
    let studio_page = StudioPage::load(state, user, &mut session, aiid).await?;
    let values = match values {
        Some(values) => values,
        None => {
            let ai: Ai = serde_json::from_value(studio_page.ai.clone())
                .map_err(|e| ConsoleError::Unexpected(format!("malformed AI: {e}")))?;
            initial([
                ("name", ai.name),
                ("description", ai.description),
                ("voice", ai.voice.to_string()),
                ("timezone", ai.timezone),
                (
                    "default_chat_responses",
                    join_tokens(&ai.default_chat_responses, state.delimiter()),
                ),
                ("confidence", ai.confidence.to_string()),
                ("personality", ai.personality.to_string()),
                (
                    "handover_reset_timeout",
                    (ai.handover_reset_timeout_seconds / 60).to_string(),
                ),
                (
                    "error_threshold_handover",
                    ai.error_threshold_handover.to_string(),
                ),
                ("handover_message", ai.handover_message),
            ])
        }
    };
    page(
        session,
        "settings_form.html",
        context! {
            values => values,
            errors => errors,
            voices => VOICES,
            personalities => PERSONALITIES,
            timezones => TIMEZONES,
            delimiter => state.delimiter(),
            ..studio_page.context()
        },
    )
}

pub async fn settings_form(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    settings_page(&state, &user, session, &aiid, None, FormErrors::default()).await
}

pub async fn settings_submit(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let form = match SettingsAiForm::parse(&data, state.delimiter()) {
        Ok(form) => form,
        Err(errors) => {
            return settings_page(&state, &user, session, &aiid, Some(data.values()), errors)
                .await;
        }
    };

    let resp = studio::post_ai(&state.api, &user.token, form.to_form(), Some(&aiid)).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        return Ok(session.redirect(&format!("/bots/edit/{aiid}/settings")));
    }
    session.flash(FlashLevel::Error, resp.info());
    settings_page(
        &state,
        &user,
        session,
        &aiid,
        Some(data.values()),
        FormErrors::default(),
    )
    .await
}

async fn training_page(
    state: &AppState,
    user: &SessionUser,
    mut session: SessionJar,
    aiid: &str,
    errors: FormErrors,
) -> Result<Response, ConsoleError> {
    let (studio_page, training) = tokio::join!(
        StudioPage::load(state, user, &mut session, aiid),
        studio::get_ai_training(&state.api, &user.token, aiid),
    );
    let studio_page = studio_page?;
    let training_data: String = training?.field_or_default("trainingFile")?;
    page(
        session,
        "training.html",
        context! {
            training_data => training_data,
            field => TrainingForm::FIELD,
            errors => errors,
            ..studio_page.context()
        },
    )
}

pub async fn training_form(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    training_page(&state, &user, session, &aiid, FormErrors::default()).await
}

pub async fn training_submit(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let form = match TrainingForm::parse(&data) {
        Ok(form) => form,
        Err(errors) => return training_page(&state, &user, session, &aiid, errors).await,
    };

    let mut resp = studio::post_training(&state.api, &user.token, &aiid, form.file).await?;
    if saved(resp.status.code) {
        resp = studio::put_training_start(&state.api, &user.token, &aiid).await?;
    }
    let level = if saved(resp.status.code) {
        FlashLevel::Success
    } else {
        FlashLevel::Error
    };
    session.flash(level, resp.info());
    Ok(session.redirect(&format!("/bots/edit/{aiid}/training")))
}

/// Restarts training, then goes back to the page the user came from.
pub async fn retrain(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    headers: HeaderMap,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let mut resp = studio::put_training_update(&state.api, &user.token, &aiid).await?;
    if saved(resp.status.code) {
        resp = studio::put_training_start(&state.api, &user.token, &aiid).await?;
    }
    let level = if saved(resp.status.code) {
        FlashLevel::Success
    } else {
        FlashLevel::Error
    };
    session.flash(level, resp.info());

    let target = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("/bots/edit/{aiid}"));
    Ok(session.redirect(&target))
}

async fn skills_page(
    state: &AppState,
    user: &SessionUser,
    mut session: SessionJar,
    aiid: &str,
    selected: Option<Vec<String>>,
    errors: FormErrors,
) -> Result<Response, ConsoleError> {
    let (studio_page, purchased) = tokio::join!(
        StudioPage::load(state, user, &mut session, aiid),
        botstore::get_purchased(&state.api, &user.token),
    );
    let studio_page = studio_page?;
    let purchased = purchased?;
    let selected = match selected {
        Some(selected) => selected,
        None => {
            let linked: Vec<i64> = serde_json::from_value(
                studio_page.ai.get("linked_bots").cloned().unwrap_or_default(),
            )
            .unwrap_or_default();
            linked.iter().map(i64::to_string).collect()
        }
    };
    page(
        session,
        "skills.html",
        context! {
            skills => purchased,
            selected => selected,
            errors => errors,
            ..studio_page.context()
        },
    )
}

pub async fn skills_form(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    skills_page(&state, &user, session, &aiid, None, FormErrors::default()).await
}

pub async fn skills_submit(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let choices: Vec<String> = botstore::get_purchased(&state.api, &user.token)
        .await?
        .iter()
        .map(|bot| bot.bot_id.to_string())
        .collect();

    let form = match SkillsForm::parse(&data, &choices) {
        Ok(form) => form,
        Err(errors) => {
            let selected = data.get_all("skills").into_iter().map(str::to_string).collect();
            return skills_page(&state, &user, session, &aiid, Some(selected), errors).await;
        }
    };

    let resp = studio::post_ai_skill(&state.api, &user.token, &aiid, &form.skills).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, "Skills updated");
    } else {
        session.flash(FlashLevel::Error, resp.info());
    }
    Ok(session.redirect(&format!("/bots/edit/{aiid}/skills")))
}
