//! Bot store listings and publishing. Listing calls work anonymously.

use botstudio_schema::{StoreBot, StoreCategory};
use serde_json::{Map, Value};

use super::merge_form;
use crate::api::{ApiClient, ApiRequest, ApiResponse, UploadedFile};
use crate::error::ApiError;

/// Categories a published bot may be filed under.
pub const STORE_CATEGORIES: [&str; 16] = [
    "Other",
    "Education",
    "Entertainment",
    "Events",
    "Finance",
    "Fitness",
    "Games",
    "Health & Beauty",
    "Internet of Things",
    "News",
    "Personal",
    "Shopping",
    "Social",
    "Sports",
    "Travel",
    "Virtual Assistants",
];

/// Resolves a URL category (any case) to its canonical name.
pub fn canonical_category(raw: &str) -> Option<&'static str> {
    STORE_CATEGORIES
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(raw))
}

pub async fn get_categories(
    api: &ApiClient,
    token: Option<&str>,
) -> Result<Vec<StoreCategory>, ApiError> {
    // Object order is the upstream's display order.
    let categories: Map<String, Value> = api
        .fetch(
            token,
            ApiRequest::get("/ui/botstore/per_category")
                .query("startFrom", 0)
                .query("pageSize", 8),
        )
        .await?
        .field_or_default("categories")?;

    categories
        .into_iter()
        .map(|(category, bots)| {
            let bots = serde_json::from_value(bots)
                .map_err(|e| ApiError::format(format!("API response is malformed: {e}")))?;
            Ok(StoreCategory { category, bots })
        })
        .collect()
}

pub async fn get_bots(
    api: &ApiClient,
    token: Option<&str>,
    category: &str,
) -> Result<Vec<StoreBot>, ApiError> {
    api.fetch(
        token,
        ApiRequest::get("/ui/botstore")
            .query("filter", format!("category='{category}'"))
            .query("startFrom", 0)
            .query("pageSize", 24),
    )
    .await?
    .field_or_default("items")
}

pub async fn get_bot(
    api: &ApiClient,
    token: Option<&str>,
    bot_id: i64,
) -> Result<StoreBot, ApiError> {
    api.fetch(token, ApiRequest::get("/ui/botstore/{bot_id}").arg("bot_id", bot_id))
        .await?
        .field("item")
}

/// Skills the developer owns and may link to a bot.
pub async fn get_purchased(api: &ApiClient, token: &str) -> Result<Vec<StoreBot>, ApiError> {
    api.fetch(Some(token), ApiRequest::get("/botstore/purchased"))
        .await?
        .field_or_default("bots")
}

pub async fn post_bot(
    api: &ApiClient,
    token: &str,
    aiid: &str,
    data: Vec<(String, String)>,
) -> Result<ApiResponse, ApiError> {
    let form = merge_form(&[("publishing_type", "1"), ("aiid", aiid)], data);
    api.fetch(Some(token), ApiRequest::post("/botstore").form(form))
        .await
}

pub async fn post_icon(
    api: &ApiClient,
    token: &str,
    bot_id: i64,
    icon: UploadedFile,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/botstore/{bot_id}/icon")
            .arg("bot_id", bot_id)
            .file("file", icon),
    )
    .await
}

pub async fn post_purchase(
    api: &ApiClient,
    token: &str,
    bot_id: i64,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/botstore/purchase/{bot_id}").arg("bot_id", bot_id),
    )
    .await
}
