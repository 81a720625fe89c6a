//! Bot store: browsing works without an account, publishing and purchasing need one.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::get,
};
use botstudio_schema::DeveloperInfo;
use minijinja::context;
use serde_json::Value;

use crate::api::ApiResponse;
use crate::error::ConsoleError;
use crate::forms::publish::{LICENSE_TYPES, PublishForm};
use crate::forms::FormErrors;
use crate::server::extract::FormInput;
use crate::server::guards::LoggedIn;
use crate::server::render::{encode_segment, page};
use crate::server::routes::{Values, saved};
use crate::server::router::AppState;
use crate::server::session::{FlashLevel, SessionJar, SessionUser};
use crate::services::botstore::{self, STORE_CATEGORIES, canonical_category};
use crate::services::{studio, users};

const MISSING_INFO_MESSAGE: &str = "This is your first bot. Before publishing this to our store \
we need to collect some developer details.";
const PURCHASED_MESSAGE: &str =
    "Skill successfully added! You can now add this skill to your bots.";

fn session_token(session: &SessionJar) -> Option<String> {
    session.user().map(|user| user.token.clone())
}

pub async fn categories(
    State(state): State<AppState>,
    session: SessionJar,
) -> Result<Response, ConsoleError> {
    let token = session_token(&session);
    let categories = botstore::get_categories(&state.api, token.as_deref()).await?;
    page(session, "categories.html", context! { categories => categories })
}

pub async fn bot_list(
    State(state): State<AppState>,
    Path(category): Path<String>,
    session: SessionJar,
) -> Result<Response, ConsoleError> {
    let category = canonical_category(&category).ok_or(ConsoleError::NotFound)?;
    let token = session_token(&session);
    let bots = botstore::get_bots(&state.api, token.as_deref(), category).await?;
    page(
        session,
        "bot_list.html",
        context! { category => category, bots => bots },
    )
}

pub async fn bot_detail(
    State(state): State<AppState>,
    Path(bot_id): Path<i64>,
    session: SessionJar,
) -> Result<Response, ConsoleError> {
    let token = session_token(&session);
    let bot = botstore::get_bot(&state.api, token.as_deref(), bot_id).await?;
    let category_path = encode_segment(&bot.category.to_lowercase());
    page(
        session,
        "bot_detail.html",
        context! { bot => bot, category_path => category_path },
    )
}

pub async fn purchase(
    State(state): State<AppState>,
    Path(bot_id): Path<i64>,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let resp = botstore::post_purchase(&state.api, &user.token, bot_id).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, PURCHASED_MESSAGE);
    } else {
        session.flash(FlashLevel::Error, resp.info());
    }
    Ok(session.redirect(&format!("/botstore/bots/{bot_id}")))
}

/// Developer details, or a redirect collecting them first.
async fn require_info(
    state: &AppState,
    user: &SessionUser,
    session: SessionJar,
    path: &str,
) -> Result<Result<(DeveloperInfo, SessionJar), Response>, ConsoleError> {
    match users::get_info(&state.api, &user.token, &user.dev_id).await? {
        Some(info) => Ok(Ok((info, session))),
        None => {
            let mut session = session;
            session.flash(FlashLevel::Warning, MISSING_INFO_MESSAGE);
            let next = url::form_urlencoded::byte_serialize(path.as_bytes()).collect::<String>();
            Ok(Err(session.redirect(&format!("/users/info?next={next}"))))
        }
    }
}

/// Listing fields prefilled from the bot itself.
fn publish_initial(ai: &Value) -> Values {
    ["name", "description", "longDescription", "sample", "licenseType", "category"]
        .into_iter()
        .filter_map(|field| {
            ai.get(field)
                .and_then(Value::as_str)
                .map(|v| (field.to_string(), v.to_string()))
        })
        .collect()
}

fn publish_page(
    session: SessionJar,
    aiid: &str,
    info: DeveloperInfo,
    values: Values,
    errors: FormErrors,
) -> Result<Response, ConsoleError> {
    page(
        session,
        "publish_form.html",
        context! {
            aiid => aiid,
            info => info,
            values => values,
            errors => errors,
            categories => STORE_CATEGORIES,
            license_types => LICENSE_TYPES,
        },
    )
}

pub async fn publish_form(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let path = format!("/botstore/publish/{aiid}");
    let (info, session) = match require_info(&state, &user, session, &path).await? {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect),
    };
    let ai = studio::get_ai(&state.api, &user.token, &aiid).await?;
    publish_page(
        session,
        &aiid,
        info,
        publish_initial(&ai.body),
        FormErrors::default(),
    )
}

pub async fn publish_submit(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let path = format!("/botstore/publish/{aiid}");
    let (info, mut session) = match require_info(&state, &user, session, &path).await? {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect),
    };

    let form = match PublishForm::parse(&data) {
        Ok(form) => form,
        Err(errors) => return publish_page(session, &aiid, info, data.values(), errors),
    };

    let resp = publish(&state, &user, &aiid, form).await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        return Ok(session.redirect("/summary"));
    }
    session.flash(FlashLevel::Error, resp.info());
    publish_page(session, &aiid, info, data.values(), FormErrors::default())
}

/// Posts the listing, then its icon once the store has assigned a bot id.
async fn publish(
    state: &AppState,
    user: &SessionUser,
    aiid: &str,
    form: PublishForm,
) -> Result<ApiResponse, ConsoleError> {
    let resp = botstore::post_bot(&state.api, &user.token, aiid, form.to_form()).await?;
    if let Some(bot_id) = resp.body.pointer("/bot/botId").and_then(Value::as_i64) {
        botstore::post_icon(&state.api, &user.token, bot_id, form.icon).await?;
    }
    Ok(resp)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/botstore", get(categories))
        .route("/botstore/bots/{bot_id}", get(bot_detail))
        .route(
            "/botstore/publish/{aiid}",
            get(publish_form).post(publish_submit),
        )
        .route("/botstore/purchase/{bot_id}", get(purchase))
        .route("/botstore/{category}", get(bot_list))
}
