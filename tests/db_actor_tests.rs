mod common;

use botstudio::db::UserCreate;

#[tokio::test]
async fn db_actor_users_and_settings_smoke() {
    let database_url = common::temp_database_url("db-actor");
    let db = botstudio::db::spawn(&database_url)
        .await
        .expect("db actor should start");

    // 1) create and look up a user
    let id = db
        .create_user(UserCreate {
            email: "grace@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            dev_id: "dev-7".to_string(),
        })
        .await
        .expect("create user failed");

    let user = db
        .get_user_by_email("grace@example.com")
        .await
        .expect("lookup failed")
        .expect("user should exist");
    assert_eq!(user.id, id);
    assert_eq!(user.dev_id, "dev-7");
    assert_eq!(user.login_count, 0);

    assert!(
        db.get_user_by_email("nobody@example.com")
            .await
            .expect("lookup failed")
            .is_none()
    );

    // 2) login counter increments
    assert_eq!(db.increment_login_count(id).await.expect("increment failed"), 1);
    assert_eq!(db.increment_login_count(id).await.expect("increment failed"), 2);
    assert_eq!(
        db.get_user_by_id(id).await.expect("get by id failed").login_count,
        2
    );

    // 3) duplicate e-mail is rejected
    let dup = db
        .create_user(UserCreate {
            email: "grace@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            dev_id: "dev-8".to_string(),
        })
        .await;
    assert!(dup.is_err());

    // 4) settings upsert
    assert!(db.get_setting("API_CHAT_TIMEOUT").await.expect("get failed").is_none());
    db.set_setting("API_CHAT_TIMEOUT", "12".to_string())
        .await
        .expect("set failed");
    db.set_setting("API_CHAT_TIMEOUT", "15".to_string())
        .await
        .expect("set failed");
    assert_eq!(
        db.get_setting("API_CHAT_TIMEOUT").await.expect("get failed"),
        Some("15".to_string())
    );
    let all = db.list_settings().await.expect("list failed");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].key, "API_CHAT_TIMEOUT");
}
