mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

fn upstream(method: &Method, path: &str) -> (StatusCode, serde_json::Value) {
    if let Some(answer) = account_routes(method, path) {
        return answer;
    }
    match (method.as_str(), path) {
        ("GET", "/ai") => (StatusCode::OK, envelope(200, json!({ "ai_list": [] }))),
        _ => (StatusCode::NOT_FOUND, json!({})),
    }
}

#[tokio::test]
async fn signup_login_and_logout_round_trip() {
    let stub = StubApi::start(upstream).await;
    let app = app_for(&stub, "accounts").await;

    // 1) signup creates the upstream developer with the admin token and signs in
    let cookie = signed_in(&app).await;
    let created = stub
        .calls()
        .into_iter()
        .find(|c| c.method == Method::POST && c.path == "/admin/")
        .expect("signup should create the upstream developer");
    assert_eq!(
        created.authorization.as_deref(),
        Some(format!("Bearer {ADMIN_TOKEN}").as_str())
    );
    assert!(stub.called(Method::GET, &format!("/admin/{DEV_ID}/devToken/")));

    // 2) the session token is used for the studio; no bots yet -> welcome page
    let resp = send(&app, get("/summary", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list_call = stub
        .calls()
        .into_iter()
        .find(|c| c.method == Method::GET && c.path == "/ai")
        .expect("summary should list the bots");
    assert_eq!(
        list_call.authorization.as_deref(),
        Some(format!("Bearer {DEV_TOKEN}").as_str())
    );
    assert!(body_string(resp).await.contains("Welcome"));

    // 3) the same e-mail cannot sign up twice
    let resp = send(
        &app,
        post_form(
            "/accounts/signup",
            None,
            &[
                ("email", EMAIL),
                ("password", PASSWORD),
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
                ("agree", "on"),
            ],
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("already registered"));

    // 4) logout drops the user
    let resp = send(&app, post_form("/accounts/logout", Some(&cookie), &[])).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), Some("/accounts/login"));

    // 5) wrong password re-renders the form
    let resp = send(
        &app,
        post_form(
            "/accounts/login",
            None,
            &[("email", EMAIL), ("password", "not-the-password")],
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_none());
    assert!(body_string(resp).await.contains("are not correct"));

    // 6) the right password lands on `next`
    let resp = send(
        &app,
        post_form(
            "/accounts/login?next=%2Fbotstore",
            None,
            &[("email", EMAIL), ("password", PASSWORD)],
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), Some("/botstore"));
    assert!(session_cookie(&resp).is_some());
}

#[tokio::test]
async fn login_ignores_offsite_next() {
    let stub = StubApi::start(upstream).await;
    let app = app_for(&stub, "accounts-next").await;
    signed_in(&app).await;

    let resp = send(
        &app,
        post_form(
            "/accounts/login?next=https%3A%2F%2Fevil.example%2F",
            None,
            &[("email", EMAIL), ("password", PASSWORD)],
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), Some("/summary"));

    // a tab after the first slash would collapse to `//host` in the browser
    let resp = send(
        &app,
        post_form(
            "/accounts/login?next=%2F%09%2Fevil.example",
            None,
            &[("email", EMAIL), ("password", PASSWORD)],
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), Some("/summary"));
}

#[tokio::test]
async fn anonymous_pages_redirect_and_json_endpoints_answer_401() {
    let stub = StubApi::start(upstream).await;
    let app = app_for(&stub, "accounts-anon").await;

    let resp = send(&app, get("/bots/edit/abc/intents", None)).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        location(&resp),
        Some("/accounts/login?next=%2Fbots%2Fedit%2Fabc%2Fintents")
    );

    let resp = send(&app, get("/proxy/ai/abc", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(body_string(resp).await.contains("Requires authentication"));

    assert!(stub.calls().is_empty());
}
