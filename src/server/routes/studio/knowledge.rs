//! Entities and intents of a bot.

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use botstudio_schema::{Entity, Intent};
use minijinja::context;

use super::StudioPage;
use crate::error::ConsoleError;
use crate::forms::entity::EntityForm;
use crate::forms::intent::{
    ConditionsFormset, ContextFormset, EntityFormset, IntentRows, IntentSubmission, OPERATORS,
};
use crate::forms::ai::IntentsUploadForm;
use crate::forms::{FormData, FormErrors, join_tokens};
use crate::server::extract::FormInput;
use crate::server::guards::LoggedIn;
use crate::server::render::{encode_segment, page};
use crate::server::routes::{
    NextQuery, RETRAIN_MESSAGE, Values, initial, retrain_link, safe_next, saved,
};
use crate::server::router::AppState;
use crate::server::session::{FlashLevel, SessionJar, SessionUser};
use crate::services::studio;

async fn sorted_entities(state: &AppState, token: &str) -> Result<Vec<Entity>, ConsoleError> {
    let mut entities = studio::get_entities_list(&state.api, token).await?;
    Entity::sort_for_display(&mut entities);
    Ok(entities)
}

async fn entity_page(
    state: &AppState,
    user: &SessionUser,
    mut session: SessionJar,
    aiid: &str,
    entity_name: Option<&str>,
    values: Values,
    errors: FormErrors,
) -> Result<Response, ConsoleError> {
    let (studio_page, entities) = tokio::join!(
        StudioPage::load(state, user, &mut session, aiid),
        sorted_entities(state, &user.token),
    );
    let studio_page = studio_page?;
    let action = match entity_name {
        Some(name) => format!("/bots/edit/{aiid}/entities/{}", encode_segment(name)),
        None => format!("/bots/edit/{aiid}/entities"),
    };
    page(
        session,
        "entity_form.html",
        context! {
            entities => entities?,
            entity_name => entity_name,
            action => action,
            values => values,
            errors => errors,
            delimiter => state.delimiter(),
            ..studio_page.context()
        },
    )
}

async fn save_entity(
    state: &AppState,
    user: &SessionUser,
    mut session: SessionJar,
    aiid: &str,
    entity_name: Option<&str>,
    data: FormData,
) -> Result<Response, ConsoleError> {
    let form = match EntityForm::parse(&data, state.delimiter()) {
        Ok(form) => form,
        Err(errors) => {
            return entity_page(state, user, session, aiid, entity_name, data.values(), errors)
                .await;
        }
    };

    let resp =
        studio::post_entity(&state.api, &user.token, &form.entity_name, &form.entity_values)
            .await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        let target = format!(
            "/bots/edit/{aiid}/entities/{}",
            encode_segment(&form.entity_name)
        );
        return Ok(session.redirect(&target));
    }
    session.flash(FlashLevel::Error, resp.info());
    entity_page(
        state,
        user,
        session,
        aiid,
        entity_name,
        data.values(),
        FormErrors::default(),
    )
    .await
}

pub async fn entities_form(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    entity_page(
        &state,
        &user,
        session,
        &aiid,
        None,
        Values::new(),
        FormErrors::default(),
    )
    .await
}

pub async fn entities_submit(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    save_entity(&state, &user, session, &aiid, None, data).await
}

pub async fn entity_edit_form(
    State(state): State<AppState>,
    Path((aiid, entity_name)): Path<(String, String)>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let entity: Entity = studio::get_entity(&state.api, &user.token, &entity_name)
        .await?
        .parse()?;
    let values = initial([
        ("entity_name", entity.entity_name.clone()),
        (
            "entity_values",
            join_tokens(&entity.entity_values, state.delimiter()),
        ),
    ]);
    entity_page(
        &state,
        &user,
        session,
        &aiid,
        Some(&entity.entity_name),
        values,
        FormErrors::default(),
    )
    .await
}

pub async fn entity_edit_submit(
    State(state): State<AppState>,
    Path((aiid, entity_name)): Path<(String, String)>,
    LoggedIn { user, session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    save_entity(&state, &user, session, &aiid, Some(&entity_name), data).await
}

pub async fn entity_delete(
    State(state): State<AppState>,
    Path((aiid, entity_name)): Path<(String, String)>,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let resp = studio::delete_entity(&state.api, &user.token, &entity_name).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, "Entity removed");
    } else {
        session.flash(FlashLevel::Error, resp.info());
    }
    Ok(session.redirect(&format!("/bots/edit/{aiid}/entities")))
}

pub async fn intents_list(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let (studio_page, intents) = tokio::join!(
        StudioPage::load(&state, &user, &mut session, &aiid),
        studio::get_intent_list(&state.api, &user.token, &aiid),
    );
    let studio_page = studio_page?;
    let intents = intents?;
    let template = if intents.is_empty() {
        "intents_empty.html"
    } else {
        "intents_list.html"
    };
    page(
        session,
        template,
        context! {
            intents => intents,
            ..studio_page.context()
        },
    )
}

struct IntentPage<'a> {
    aiid: &'a str,
    intent_name: Option<&'a str>,
    next: Option<&'a str>,
    rows: IntentRows,
    errors: FormErrors,
}

async fn intent_page(
    state: &AppState,
    user: &SessionUser,
    mut session: SessionJar,
    form: IntentPage<'_>,
) -> Result<Response, ConsoleError> {
    let (studio_page, entities) = tokio::join!(
        StudioPage::load(state, user, &mut session, form.aiid),
        sorted_entities(state, &user.token),
    );
    let studio_page = studio_page?;
    let aiid = form.aiid;
    let mut action = match form.intent_name {
        Some(name) => format!("/bots/edit/{aiid}/intents/edit/{}", encode_segment(name)),
        None => format!("/bots/edit/{aiid}/intents/add"),
    };
    if let Some(next) = safe_next(form.next) {
        action.push_str("?next=");
        action.push_str(&url::form_urlencoded::byte_serialize(next.as_bytes()).collect::<String>());
    }
    page(
        session,
        "intent_form.html",
        context! {
            intent_name => form.intent_name,
            action => action,
            rows => form.rows,
            errors => form.errors,
            entities => entities?,
            operators => OPERATORS,
            prefixes => context! {
                conditions => ConditionsFormset::PREFIX,
                entities => EntityFormset::PREFIX,
                context_in => ContextFormset::IN_PREFIX,
                context_out => ContextFormset::OUT_PREFIX,
            },
            delimiter => state.delimiter(),
            ..studio_page.context()
        },
    )
}

async fn save_intent(
    state: &AppState,
    user: &SessionUser,
    mut session: SessionJar,
    aiid: &str,
    intent_name: Option<&str>,
    next: Option<&str>,
    data: FormData,
) -> Result<Response, ConsoleError> {
    let available: Vec<String> = studio::get_entities_list(&state.api, &user.token)
        .await?
        .into_iter()
        .map(|e| e.entity_name)
        .collect();

    let submission = match IntentSubmission::parse(&data, &available, state.delimiter()) {
        Ok(submission) => submission,
        Err(errors) => {
            let form = IntentPage {
                aiid,
                intent_name,
                next,
                rows: IntentRows::from_data(&data),
                errors,
            };
            return intent_page(state, user, session, form).await;
        }
    };

    let cleaned_name = submission.form.intent_name.clone();
    let resp = studio::post_intent(&state.api, &user.token, aiid, submission.payload()).await?;
    if !saved(resp.status.code) {
        session.flash(FlashLevel::Error, resp.info());
        let form = IntentPage {
            aiid,
            intent_name,
            next,
            rows: IntentRows::from_data(&data),
            errors: FormErrors::default(),
        };
        return intent_page(state, user, session, form).await;
    }

    let target = match safe_next(next) {
        Some(next) => {
            session.flash(FlashLevel::Success, "Intent saved");
            next
        }
        None => format!(
            "/bots/edit/{aiid}/intents/edit/{}",
            encode_segment(&cleaned_name)
        ),
    };
    session.flash_with_link(FlashLevel::Warning, RETRAIN_MESSAGE, retrain_link(aiid));
    Ok(session.redirect(&target))
}

pub async fn intent_add_form(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let form = IntentPage {
        aiid: &aiid,
        intent_name: None,
        next: query.next.as_deref(),
        rows: IntentRows::default(),
        errors: FormErrors::default(),
    };
    intent_page(&state, &user, session, form).await
}

pub async fn intent_add_submit(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    save_intent(&state, &user, session, &aiid, None, query.next.as_deref(), data).await
}

pub async fn intent_edit_form(
    State(state): State<AppState>,
    Path((aiid, intent_name)): Path<(String, String)>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let intent: Intent = studio::get_intent(&state.api, &user.token, &aiid, &intent_name)
        .await?
        .parse()?;
    let form = IntentPage {
        aiid: &aiid,
        intent_name: Some(&intent.intent_name),
        next: query.next.as_deref(),
        rows: IntentRows::from_intent(&intent, state.delimiter()),
        errors: FormErrors::default(),
    };
    intent_page(&state, &user, session, form).await
}

pub async fn intent_edit_submit(
    State(state): State<AppState>,
    Path((aiid, intent_name)): Path<(String, String)>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    save_intent(
        &state,
        &user,
        session,
        &aiid,
        Some(&intent_name),
        query.next.as_deref(),
        data,
    )
    .await
}

pub async fn intents_upload(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let list = format!("/bots/edit/{aiid}/intents");
    let form = match IntentsUploadForm::parse(&data) {
        Ok(form) => form,
        Err(errors) => {
            let message = errors
                .get(IntentsUploadForm::FIELD)
                .and_then(|messages| messages.first())
                .cloned()
                .unwrap_or_else(|| "Upload a CSV file.".to_string());
            session.flash(FlashLevel::Error, message);
            return Ok(session.redirect(&list));
        }
    };

    let resp = studio::post_intents_csv(&state.api, &user.token, &aiid, form.file).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        session.flash_with_link(FlashLevel::Warning, RETRAIN_MESSAGE, retrain_link(&aiid));
    } else {
        session.flash(FlashLevel::Error, resp.info());
    }
    Ok(session.redirect(&list))
}

pub async fn intent_delete(
    State(state): State<AppState>,
    Path((aiid, intent_name)): Path<(String, String)>,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let resp = studio::delete_intent(&state.api, &user.token, &aiid, &intent_name).await?;
    if saved(resp.status.code) {
        session.flash_with_link(FlashLevel::Warning, RETRAIN_MESSAGE, retrain_link(&aiid));
    } else {
        session.flash(FlashLevel::Error, resp.info());
    }
    Ok(session.redirect(&format!("/bots/edit/{aiid}/intents")))
}
