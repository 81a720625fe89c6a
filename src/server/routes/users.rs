//! Local accounts (login, signup, logout) and the developer details the store asks for.

use axum::{
    Router,
    extract::{Query, State},
    response::Response,
    routing::{get, post},
};
use minijinja::context;
use tracing::{info, warn};

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::db::UserCreate;
use crate::error::ConsoleError;
use crate::forms::users::{DeveloperInfoForm, LoginForm, SignupForm};
use crate::forms::{FormErrors, NON_FIELD_ERRORS};
use crate::server::extract::FormInput;
use crate::server::guards::LoggedIn;
use crate::server::render::page;
use crate::server::routes::{NextQuery, Values, safe_next, saved};
use crate::server::router::AppState;
use crate::server::session::{FlashLevel, SessionJar, SessionUser};
use crate::services::users;

const BAD_CREDENTIALS: &str = "The e-mail address and/or password you specified are not correct.";
const EMAIL_TAKEN: &str = "A user is already registered with this e-mail address.";
const DEFAULT_LANDING: &str = "/summary";

fn landing(next: Option<&str>) -> String {
    safe_next(next).unwrap_or_else(|| DEFAULT_LANDING.to_string())
}

fn account_page(
    session: SessionJar,
    template: &str,
    next: Option<&str>,
    values: Values,
    errors: FormErrors,
) -> Result<Response, ConsoleError> {
    page(
        session,
        template,
        context! {
            next => safe_next(next),
            values => values,
            errors => errors,
        },
    )
}

/// Exchanges a local account for an upstream token and stores both in the session.
async fn sign_in(
    state: &AppState,
    session: &mut SessionJar,
    user_id: i64,
    email: String,
    first_name: String,
    dev_id: String,
) -> Result<(), ConsoleError> {
    let token = users::get_user_token(&state.api, &state.config.api.admin_token, &dev_id).await?;
    let login_count = state.db.increment_login_count(user_id).await?;
    state.api.remember_identity(&token, &dev_id);
    info!(user_id, dev_id = %dev_id, login_count, "developer signed in");
    session.login(SessionUser {
        user_id,
        email,
        first_name,
        dev_id,
        token,
    });
    Ok(())
}

pub async fn login_form(
    Query(query): Query<NextQuery>,
    session: SessionJar,
) -> Result<Response, ConsoleError> {
    if session.user().is_some() {
        return Ok(session.redirect(&landing(query.next.as_deref())));
    }
    account_page(
        session,
        "login.html",
        query.next.as_deref(),
        Values::new(),
        FormErrors::default(),
    )
}

pub async fn login_submit(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    mut session: SessionJar,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let next = query.next.as_deref();
    let mut values = data.values();
    values.remove("password");

    let form = match LoginForm::parse(&data) {
        Ok(form) => form,
        Err(errors) => return account_page(session, "login.html", next, values, errors),
    };

    let user = state
        .db
        .get_user_by_email(&form.email.to_lowercase())
        .await?;
    let verified = match &user {
        Some(user) => {
            verify_password_blocking(form.password.clone(), user.password_hash.clone()).await?
        }
        None => false,
    };
    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!(email = %form.email, "failed login attempt");
            let errors = FormErrors::single(NON_FIELD_ERRORS, BAD_CREDENTIALS);
            return account_page(session, "login.html", next, values, errors);
        }
    };

    sign_in(
        &state,
        &mut session,
        user.id,
        user.email,
        user.first_name,
        user.dev_id,
    )
    .await?;
    Ok(session.redirect(&landing(next)))
}

pub async fn signup_form(
    Query(query): Query<NextQuery>,
    session: SessionJar,
) -> Result<Response, ConsoleError> {
    if session.user().is_some() {
        return Ok(session.redirect(&landing(query.next.as_deref())));
    }
    account_page(
        session,
        "signup.html",
        query.next.as_deref(),
        Values::new(),
        FormErrors::default(),
    )
}

pub async fn signup_submit(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    mut session: SessionJar,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let next = query.next.as_deref();
    let mut values = data.values();
    values.remove("password");

    let form = match SignupForm::parse(&data, &state.config.forms.whitelisted_email_domains) {
        Ok(form) => form,
        Err(errors) => return account_page(session, "signup.html", next, values, errors),
    };
    if state.db.get_user_by_email(&form.email).await?.is_some() {
        let errors = FormErrors::single("email", EMAIL_TAKEN);
        return account_page(session, "signup.html", next, values, errors);
    }

    let requested = uuid::Uuid::new_v4().to_string();
    let resp = users::post_user(&state.api, &state.config.api.admin_token, &requested).await?;
    if !saved(resp.status.code) {
        session.flash(FlashLevel::Error, resp.info());
        return account_page(session, "signup.html", next, values, FormErrors::default());
    }
    let dev_id = resp
        .field::<String>("devid")
        .ok()
        .filter(|id| !id.is_empty())
        .unwrap_or(requested);

    let password_hash = hash_password_blocking(form.password.clone()).await?;
    let user_id = state
        .db
        .create_user(UserCreate {
            email: form.email.clone(),
            password_hash,
            first_name: form.first_name.clone(),
            last_name: form.last_name,
            dev_id: dev_id.clone(),
        })
        .await?;
    info!(user_id, dev_id = %dev_id, "developer account created");

    sign_in(
        &state,
        &mut session,
        user_id,
        form.email,
        form.first_name,
        dev_id,
    )
    .await?;
    Ok(session.redirect(&landing(next)))
}

pub async fn logout(mut session: SessionJar) -> Response {
    session.logout();
    session.redirect("/accounts/login")
}

fn info_page(
    session: SessionJar,
    next: Option<&str>,
    values: Values,
    errors: FormErrors,
) -> Result<Response, ConsoleError> {
    account_page(session, "info_form.html", next, values, errors)
}

pub async fn info_form(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let values = users::get_info(&state.api, &user.token, &user.dev_id)
        .await?
        .map(|info| DeveloperInfoForm::to_form(&info).into_iter().collect())
        .unwrap_or_default();
    info_page(session, query.next.as_deref(), values, FormErrors::default())
}

pub async fn info_submit(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    LoggedIn { user, mut session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let next = query.next.as_deref();
    let info = match DeveloperInfoForm::parse(&data) {
        Ok(info) => info,
        Err(errors) => return info_page(session, next, data.values(), errors),
    };

    let resp = users::post_info(
        &state.api,
        &user.token,
        &user.dev_id,
        DeveloperInfoForm::to_form(&info),
    )
    .await?;
    if saved(resp.status.code) {
        session.flash(FlashLevel::Success, resp.info());
        return Ok(session.redirect(&landing(next)));
    }
    session.flash(FlashLevel::Error, resp.info());
    info_page(session, next, data.values(), FormErrors::default())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts/login", get(login_form).post(login_submit))
        .route("/accounts/signup", get(signup_form).post(signup_submit))
        .route("/accounts/logout", post(logout))
        .route("/users/info", get(info_form).post(info_submit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_falls_back_to_summary() {
        assert_eq!(landing(None), "/summary");
        assert_eq!(landing(Some("https://evil.example")), "/summary");
        assert_eq!(landing(Some("/botstore/publish/abc")), "/botstore/publish/abc");
    }
}
