use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::{ConsoleError, JsonError};
use crate::server::router::AppState;
use crate::server::session::{SessionJar, SessionUser};

/// A page request with a signed-in developer.
///
/// Anonymous requests are redirected to the login page with `next` set to the requested path.
pub struct LoggedIn {
    pub user: SessionUser,
    pub session: SessionJar,
}

impl FromRequestParts<AppState> for LoggedIn {
    type Rejection = ConsoleError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(session) = SessionJar::from_request_parts(parts, state).await;
        match session.user().cloned() {
            Some(user) => {
                state.api.remember_identity(&user.token, &user.dev_id);
                Ok(LoggedIn { user, session })
            }
            None => Err(ConsoleError::LoginRequired {
                next: parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string()),
            }),
        }
    }
}

/// Same as [`LoggedIn`] for JSON endpoints: anonymous callers get a 401 body instead.
pub struct LoggedInJson {
    pub user: SessionUser,
    pub session: SessionJar,
}

impl FromRequestParts<AppState> for LoggedInJson {
    type Rejection = JsonError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let LoggedIn { user, session } = LoggedIn::from_request_parts(parts, state).await?;
        Ok(LoggedInJson { user, session })
    }
}
