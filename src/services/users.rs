//! Developer accounts. Token and account creation use the configured admin token.

use botstudio_schema::DeveloperInfo;

use crate::api::{ApiClient, ApiRequest, ApiResponse};
use crate::error::ApiError;

/// Role every developer created from the console gets.
pub const DEFAULT_ROLE: &str = "ROLE_DEV";

/// Bearer token for `dev_id`.
pub async fn get_user_token(
    api: &ApiClient,
    admin_token: &str,
    dev_id: &str,
) -> Result<String, ApiError> {
    api.fetch(
        Some(admin_token),
        ApiRequest::get("/admin/{dev_id}/devToken/").arg("dev_id", dev_id),
    )
    .await?
    .field("dev_token")
}

/// Creates the upstream developer, returning its id when the API reports one.
pub async fn post_user(
    api: &ApiClient,
    admin_token: &str,
    dev_id: &str,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(admin_token),
        ApiRequest::post("/admin/").form(vec![
            ("dev_id".to_string(), dev_id.to_string()),
            ("role".to_string(), DEFAULT_ROLE.to_string()),
        ]),
    )
    .await
}

/// Publisher details, `None` until the developer saved them.
pub async fn get_info(
    api: &ApiClient,
    token: &str,
    dev_id: &str,
) -> Result<Option<DeveloperInfo>, ApiError> {
    let resp = match api
        .fetch(
            Some(token),
            ApiRequest::get("/developer/{dev_id}").arg("dev_id", dev_id),
        )
        .await
    {
        Ok(resp) => resp,
        Err(ApiError::ResourceHidden) => return Ok(None),
        Err(e) => return Err(e),
    };
    if resp.status.code != 200 {
        return Ok(None);
    }
    resp.field_or_default("info")
}

pub async fn post_info(
    api: &ApiClient,
    token: &str,
    dev_id: &str,
    data: Vec<(String, String)>,
) -> Result<ApiResponse, ApiError> {
    api.fetch(
        Some(token),
        ApiRequest::post("/developer/{dev_id}")
            .arg("dev_id", dev_id)
            .form(data),
    )
    .await
}
