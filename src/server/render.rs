use axum::{
    http::{StatusCode, header::LOCATION},
    response::{Html, IntoResponse, Response},
};
use minijinja::{Environment, Value, context};
use serde::Serialize;
use std::sync::LazyLock;
use tracing::error;

use crate::error::ConsoleError;
use crate::server::session::{FlashLevel, SessionJar};

const TEMPLATE_SOURCES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("404.html", include_str!("../../templates/404.html")),
    ("500.html", include_str!("../../templates/500.html")),
    ("form_errors.html", include_str!("../../templates/form_errors.html")),
    ("ai_nav.html", include_str!("../../templates/ai_nav.html")),
    ("welcome.html", include_str!("../../templates/welcome.html")),
    ("ai_list.html", include_str!("../../templates/ai_list.html")),
    ("ai_wizard.html", include_str!("../../templates/ai_wizard.html")),
    ("ai_form.html", include_str!("../../templates/ai_form.html")),
    ("ai_import.html", include_str!("../../templates/ai_import.html")),
    ("ai_detail.html", include_str!("../../templates/ai_detail.html")),
    ("settings_form.html", include_str!("../../templates/settings_form.html")),
    ("training.html", include_str!("../../templates/training.html")),
    ("skills.html", include_str!("../../templates/skills.html")),
    ("entity_form.html", include_str!("../../templates/entity_form.html")),
    ("intents_list.html", include_str!("../../templates/intents_list.html")),
    ("intents_empty.html", include_str!("../../templates/intents_empty.html")),
    ("intents_upload.html", include_str!("../../templates/intents_upload.html")),
    ("intent_form.html", include_str!("../../templates/intent_form.html")),
    ("integration.html", include_str!("../../templates/integration.html")),
    ("insights.html", include_str!("../../templates/insights.html")),
    ("categories.html", include_str!("../../templates/categories.html")),
    ("bot_list.html", include_str!("../../templates/bot_list.html")),
    ("bot_detail.html", include_str!("../../templates/bot_detail.html")),
    ("publish_form.html", include_str!("../../templates/publish_form.html")),
    ("info_form.html", include_str!("../../templates/info_form.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("signup.html", include_str!("../../templates/signup.html")),
];

static TEMPLATES: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_filter("pathquote", pathquote);
    for &(name, source) in TEMPLATE_SOURCES {
        env.add_template(name, source)
            .unwrap_or_else(|e| panic!("template {name} failed to load: {e}"));
    }
    env
});

/// Percent-encodes a value for use as one URL path segment.
pub fn encode_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn pathquote(value: String) -> String {
    encode_segment(&value)
}

pub fn render(name: &str, ctx: Value) -> Result<String, ConsoleError> {
    Ok(TEMPLATES.get_template(name)?.render(ctx)?)
}

#[derive(Serialize)]
struct MessageView {
    level: FlashLevel,
    class: &'static str,
    text: String,
    link: Option<String>,
}

/// Renders a full page, consuming the pending flash messages.
pub fn page(session: SessionJar, name: &str, ctx: Value) -> Result<Response, ConsoleError> {
    page_with_status(session, StatusCode::OK, name, ctx)
}

pub fn page_with_status(
    mut session: SessionJar,
    status: StatusCode,
    name: &str,
    ctx: Value,
) -> Result<Response, ConsoleError> {
    let messages: Vec<MessageView> = session
        .take_messages()
        .into_iter()
        .map(|m| MessageView {
            level: m.level,
            class: m.level.css_class(),
            text: m.text,
            link: m.link,
        })
        .collect();
    let html = render(
        name,
        context! {
            messages => messages,
            user => session.user().cloned(),
            ..ctx
        },
    )?;
    Ok(session.respond((status, Html(html))))
}

/// 302 redirect.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// Error page; falls back to plain text if the template itself fails.
pub fn error_page(status: StatusCode) -> Response {
    let name = if status == StatusCode::NOT_FOUND {
        "404.html"
    } else {
        "500.html"
    };
    match render(name, context! { status => status.as_u16() }) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("error page {name} failed to render: {e}");
            (status, status.canonical_reason().unwrap_or("Error")).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_parses() {
        for (name, _) in TEMPLATE_SOURCES {
            assert!(TEMPLATES.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn pathquote_encodes_one_segment() {
        assert_eq!(pathquote("a b/c".to_string()), "a%20b%2Fc");
        assert_eq!(pathquote("Health & Beauty".to_string()), "Health%20%26%20Beauty");
    }

    #[test]
    fn error_pages_keep_their_status() {
        assert_eq!(error_page(StatusCode::NOT_FOUND).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            error_page(StatusCode::INTERNAL_SERVER_ERROR).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
