//! Bot studio pages: bots, knowledge (entities and intents), integrations, insights and the
//! JSON proxies used by the in-page chat.

mod bots;
mod insights;
mod integrations;
mod knowledge;
mod proxy;

use axum::{
    Router,
    routing::{get, post},
};
use botstudio_schema::AiDetails;
use minijinja::{Value, context};

use crate::error::ConsoleError;
use crate::server::router::AppState;
use crate::server::session::{FlashLevel, SessionJar, SessionUser};
use crate::services::studio;

const NOT_CHATABLE: &str = "To start chatting with your bot either upload a training file, \
add a skill, or add an intent.";

/// What every per-bot page shows in its header and navigation.
pub(crate) struct StudioPage {
    pub aiid: String,
    pub ai: serde_json::Value,
    pub details: AiDetails,
    /// Shows the chat widget. Pages without one switch it off after loading.
    pub chatable: bool,
}

impl StudioPage {
    pub async fn load(
        state: &AppState,
        user: &SessionUser,
        session: &mut SessionJar,
        aiid: &str,
    ) -> Result<Self, ConsoleError> {
        let (ai, details) = tokio::join!(
            studio::get_ai(&state.api, &user.token, aiid),
            studio::get_ai_details(&state.api, &user.token, aiid),
        );
        let details: AiDetails = details?.parse()?;
        if !details.chatable() {
            session.flash(FlashLevel::Info, NOT_CHATABLE);
        }
        Ok(Self {
            aiid: aiid.to_string(),
            ai: ai?.body,
            chatable: details.chatable(),
            details,
        })
    }

    pub fn context(&self) -> Value {
        context! {
            aiid => self.aiid,
            ai => self.ai,
            ai_details => self.details,
            chatable => self.chatable,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(bots::home))
        .route("/summary", get(bots::summary))
        .route("/bots/wizard", get(bots::wizard))
        .route("/bots/add", get(bots::add_form).post(bots::add_submit))
        .route(
            "/bots/clone/{aiid}",
            get(bots::clone_form).post(bots::clone_submit),
        )
        .route("/bots/import", get(bots::import_form).post(bots::import_submit))
        .route("/bots/edit/{aiid}", get(bots::detail))
        .route("/bots/dashboard/{aiid}", get(bots::detail))
        .route(
            "/bots/edit/{aiid}/import",
            get(bots::reimport_form).post(bots::reimport_submit),
        )
        .route(
            "/bots/edit/{aiid}/settings",
            get(bots::settings_form).post(bots::settings_submit),
        )
        .route(
            "/bots/edit/{aiid}/training",
            get(bots::training_form).post(bots::training_submit),
        )
        .route("/bots/edit/{aiid}/retrain", get(bots::retrain))
        .route(
            "/bots/edit/{aiid}/skills",
            get(bots::skills_form).post(bots::skills_submit),
        )
        .route(
            "/bots/edit/{aiid}/entities",
            get(knowledge::entities_form).post(knowledge::entities_submit),
        )
        .route(
            "/bots/edit/{aiid}/entities/{entity_name}",
            get(knowledge::entity_edit_form).post(knowledge::entity_edit_submit),
        )
        .route(
            "/entity/delete/{aiid}/{entity_name}",
            post(knowledge::entity_delete),
        )
        .route("/bots/edit/{aiid}/intents", get(knowledge::intents_list))
        .route(
            "/bots/edit/{aiid}/intents/add",
            get(knowledge::intent_add_form).post(knowledge::intent_add_submit),
        )
        .route(
            "/bots/edit/{aiid}/intents/edit/{intent_name}",
            get(knowledge::intent_edit_form).post(knowledge::intent_edit_submit),
        )
        .route(
            "/bots/edit/{aiid}/intents/bulk/upload",
            post(knowledge::intents_upload),
        )
        .route(
            "/intent/delete/{aiid}/{intent_name}",
            post(knowledge::intent_delete),
        )
        .route("/bots/edit/{aiid}/integrations", get(integrations::show))
        .route("/oauth", get(integrations::oauth))
        .route(
            "/bots/edit/{aiid}/integrations/facebook/customise",
            post(integrations::facebook_customise),
        )
        .route(
            "/bots/edit/{aiid}/integrations/facebook/{action}",
            get(integrations::facebook_action),
        )
        .route("/bots/edit/{aiid}/insights", get(insights::show))
        .route("/bots/edit/{aiid}/insights/logs", post(insights::logs))
        .route(
            "/bots/edit/{aiid}/insights/chart/{metric}",
            get(insights::chart),
        )
        .route(
            "/proxy/ai/{aiid}",
            get(proxy::ai_get).post(proxy::ai_delete),
        )
        .route("/proxy/ai/{aiid}/export", get(proxy::ai_export))
        .route(
            "/proxy/ai/{aiid}/handover/reset",
            post(proxy::handover_reset),
        )
        .route("/proxy/ai/{aiid}/context/reset", post(proxy::context_reset))
        .route("/proxy/ai/{aiid}/chat", post(proxy::chat))
        .route(
            "/proxy/ai/{aiid}/regenerate_webhook_secret",
            post(proxy::regenerate_webhook_secret),
        )
}
