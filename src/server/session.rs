//! Browser session kept in one encrypted cookie: the signed-in developer plus pending flash
//! messages.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use time::Duration;
use tracing::debug;

use crate::server::render::found;
use crate::server::router::AppState;

pub const SESSION_COOKIE: &str = "botstudio_session";
const SESSION_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    /// CSS class used by the templates.
    pub fn css_class(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub text: String,
    /// Follow-up action shown next to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// The signed-in developer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub dev_id: String,
    /// Bearer token for the upstream API.
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub messages: Vec<Flash>,
}

impl Session {
    fn is_empty(&self) -> bool {
        self.user.is_none() && self.messages.is_empty()
    }
}

/// The decoded session together with the jar it is written back to.
pub struct SessionJar {
    jar: PrivateCookieJar,
    pub session: Session,
    secure: bool,
}

impl SessionJar {
    pub fn new(jar: PrivateCookieJar, secure: bool) -> Self {
        let session = jar
            .get(SESSION_COOKIE)
            .and_then(|c| match serde_json::from_str::<Session>(c.value()) {
                Ok(session) => Some(session),
                Err(e) => {
                    debug!("discarding unreadable session cookie: {e}");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            jar,
            session,
            secure,
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.session.user.as_ref()
    }

    pub fn flash(&mut self, level: FlashLevel, text: impl Into<String>) {
        self.session.messages.push(Flash {
            level,
            text: text.into(),
            link: None,
        });
    }

    pub fn flash_with_link(
        &mut self,
        level: FlashLevel,
        text: impl Into<String>,
        link: impl Into<String>,
    ) {
        self.session.messages.push(Flash {
            level,
            text: text.into(),
            link: Some(link.into()),
        });
    }

    /// Messages are shown once: rendering a page consumes them.
    pub fn take_messages(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.session.messages)
    }

    pub fn login(&mut self, user: SessionUser) {
        self.session.user = Some(user);
    }

    pub fn logout(&mut self) {
        self.session.user = None;
    }

    /// Writes the session back, or removes the cookie once nothing is left in it.
    pub fn into_jar(self) -> PrivateCookieJar {
        if self.session.is_empty() {
            return self.jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
        }
        let value = match serde_json::to_string(&self.session) {
            Ok(value) => value,
            Err(_) => return self.jar,
        };
        self.jar.add(
            Cookie::build((SESSION_COOKIE, value))
                .path("/")
                .http_only(true)
                .secure(self.secure)
                .same_site(SameSite::Lax)
                .max_age(Duration::days(SESSION_DAYS))
                .build(),
        )
    }

    /// 302 to `location`, persisting the session.
    pub fn redirect(self, location: &str) -> Response {
        (self.into_jar(), found(location)).into_response()
    }

    /// Persists the session alongside any response.
    pub fn respond(self, response: impl IntoResponse) -> Response {
        (self.into_jar(), response).into_response()
    }
}

impl FromRequestParts<AppState> for SessionJar {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state).await?;
        Ok(SessionJar::new(jar, state.config.basic.secure_cookie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            user_id: 1,
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            dev_id: "dev-1".to_string(),
            token: "tok".to_string(),
        }
    }

    #[test]
    fn session_survives_the_cookie_round_trip() {
        let key = Key::generate();
        let mut session = SessionJar::new(PrivateCookieJar::new(key.clone()), false);
        session.login(user());
        session.flash(FlashLevel::Warning, "retrain");

        let jar = session.into_jar();
        assert!(jar.get(SESSION_COOKIE).is_some());

        let mut again = SessionJar::new(jar, false);
        assert_eq!(again.user(), Some(&user()));
        let messages = again.take_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level, FlashLevel::Warning);
        assert!(again.take_messages().is_empty());
    }

    #[test]
    fn empty_session_drops_the_cookie() {
        let key = Key::generate();
        let mut session = SessionJar::new(PrivateCookieJar::new(key), false);
        session.login(user());
        let jar = session.into_jar();

        let mut session = SessionJar::new(jar, false);
        session.logout();
        let jar = session.into_jar();
        assert!(jar.get(SESSION_COOKIE).is_none());
    }

    #[test]
    fn flash_levels_serialize_upper_case() {
        assert_eq!(
            serde_json::to_string(&FlashLevel::Success).unwrap(),
            "\"SUCCESS\""
        );
        assert_eq!(FlashLevel::Error.css_class(), "danger");
    }
}
