use axum::{
    Json,
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use chrono::{Days, Local, NaiveDate};
use minijinja::context;

use super::StudioPage;
use crate::error::{ApiError, ConsoleError};
use crate::server::extract::FormInput;
use crate::server::guards::LoggedIn;
use crate::server::render::page;
use crate::server::router::AppState;
use crate::services::studio;

const WINDOW_DAYS: u64 = 30;

/// `(from, to)` of the reporting window ending today.
fn window(today: NaiveDate) -> (String, String) {
    let from = today.checked_sub_days(Days::new(WINDOW_DAYS)).unwrap_or(today);
    (from.to_string(), today.to_string())
}

pub async fn show(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, mut session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let mut studio_page = StudioPage::load(&state, &user, &mut session, &aiid).await?;
    studio_page.chatable = false;
    let (from_date, to_date) = window(Local::now().date_naive());
    let date_interval = format!("from {from_date} to {to_date}");
    page(
        session,
        "insights.html",
        context! {
            from_date => from_date,
            to_date => to_date,
            date_interval => date_interval,
            ..studio_page.context()
        },
    )
}

/// Chat logs for the posted date range, as a CSV download.
pub async fn logs(
    State(state): State<AppState>,
    Path(aiid): Path<String>,
    LoggedIn { user, session }: LoggedIn,
    FormInput(data): FormInput,
) -> Result<Response, ConsoleError> {
    let resp = studio::get_insights_chatlogs(
        &state.api,
        &user.token,
        &aiid,
        &data.text("from"),
        &data.text("to"),
    )
    .await?;
    let csv = resp.bytes().await.map_err(ApiError::Transport)?;
    Ok(session.respond(
        (
            [
                (CONTENT_TYPE, "application/csv"),
                (CONTENT_DISPOSITION, "attachment; filename=\"chatlogs.csv\""),
            ],
            csv,
        )
            .into_response(),
    ))
}

pub async fn chart(
    State(state): State<AppState>,
    Path((aiid, metric)): Path<(String, String)>,
    LoggedIn { user, session }: LoggedIn,
) -> Result<Response, ConsoleError> {
    let (from, to) = window(Local::now().date_naive());
    let resp = studio::get_insights_chart(&state.api, &user.token, &aiid, &metric, &from, &to).await?;
    Ok(session.respond(Json(resp.body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_spans_thirty_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");
        assert_eq!(
            window(today),
            ("2024-02-14".to_string(), "2024-03-15".to_string())
        );
    }
}
