mod common;

use board_server::verification_token::encode_uid;
use common::{browser, cookie_value, spawn_app, spawn_app_with, PASSWORD};
use serde_json::{json, Value};
use sqlx::Row;

// --- Registration ---

#[tokio::test]
async fn register_returns_201_without_password() {
    let app = spawn_app().await;
    let client = browser();

    let response = app.register(&client, "alice").await;
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["fullname"], "Tester");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body["id"].is_i64());
    assert!(body.get("password").is_none());

    let user = sqlx::query("SELECT password_hash, is_active FROM users WHERE username = 'alice'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");
    assert_ne!(user.get::<String, _>("password_hash"), PASSWORD);
    assert!(user.get::<bool, _>("is_active"));
}

#[tokio::test]
async fn register_names_the_missing_field() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let test_cases = vec![
        (json!({"fullname": "A", "email": "a@example.com", "password": PASSWORD}), "username"),
        (json!({"username": "a", "email": "a@example.com", "password": PASSWORD}), "fullname"),
        (json!({"username": "a", "fullname": "A", "password": PASSWORD}), "email"),
        (json!({"username": "a", "fullname": "A", "email": "a@example.com"}), "password"),
    ];

    for (body, field) in test_cases {
        let response = client
            .post(app.url("/api/v1/accounts/users"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16(), "missing {}", field);
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["field"], field);
        assert_eq!(error["code"], "REQUIRED");
    }
}

#[tokio::test]
async fn register_rejects_invalid_values() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let invalid = vec![
        ("username", json!("has space")),
        ("username", json!("x".repeat(21))),
        ("username", json!("김철수")),
        ("fullname", json!("x".repeat(11))),
        ("email", json!("notanemail")),
        ("password", json!("weak")),
    ];

    for (field, value) in invalid {
        let mut body = json!({
            "username": "valid_user",
            "fullname": "Valid",
            "email": "valid@example.com",
            "password": PASSWORD,
        });
        body[field] = value;

        let response = client
            .post(app.url("/api/v1/accounts/users"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16(), "invalid {}", field);
    }
}

#[tokio::test]
async fn register_rejects_duplicate_username_with_409() {
    let app = spawn_app().await;
    let client = browser();

    assert_eq!(app.register(&client, "dup").await.status().as_u16(), 201);
    let response = app.register(&client, "dup").await;

    assert_eq!(409, response.status().as_u16());
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn malformed_json_returns_400_in_error_shape() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(app.url("/api/v1/accounts/users"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let error: Value = response.json().await.unwrap();
    assert!(error.get("error_id").is_some());
    assert_eq!(error["status"], 400);
}

// --- Own profile ---

#[tokio::test]
async fn get_user_requires_authentication() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(app.url("/api/v1/accounts/users"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], "NOT_AUTHENTICATED");
}

#[tokio::test]
async fn get_user_returns_the_requester() {
    let app = spawn_app().await;
    let client = app.logged_in("bob").await;

    let response = client
        .get(app.url("/api/v1/accounts/users"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "bob");
}

#[tokio::test]
async fn patch_user_updates_and_forces_logout() {
    let app = spawn_app().await;
    let client = browser();
    app.register(&client, "carol").await;
    let login = app.login(&client, "carol", PASSWORD).await;
    let refresh_token = cookie_value(&login, "refresh").expect("refresh cookie");

    let response = client
        .patch(app.url("/api/v1/accounts/users"))
        .json(&json!({"fullname": "Caroline"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(cookie_value(&response, "access").as_deref(), Some(""));
    assert_eq!(cookie_value(&response, "refresh").as_deref(), Some(""));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["fullname"], "Caroline");
    assert_eq!(body["username"], "carol");

    // cookies are gone, so the session is gone
    let me = client
        .get(app.url("/api/v1/accounts/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(401, me.status().as_u16());

    // and the old refresh token is blacklisted
    let replay = reqwest::Client::new()
        .post(app.url("/api/v1/accounts/refresh"))
        .header("Cookie", format!("refresh={}", refresh_token))
        .send()
        .await
        .unwrap();
    assert_eq!(401, replay.status().as_u16());
}

#[tokio::test]
async fn put_user_requires_every_field() {
    let app = spawn_app().await;
    let client = app.logged_in("dave").await;

    let response = client
        .put(app.url("/api/v1/accounts/users"))
        .json(&json!({"fullname": "Dave"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());

    let response = client
        .put(app.url("/api/v1/accounts/users"))
        .json(&json!({
            "username": "david",
            "fullname": "David",
            "email": "david@example.com",
            "password": "NewSecurePass456",
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let relogin = app.login(&browser(), "david", "NewSecurePass456").await;
    assert_eq!(200, relogin.status().as_u16());
}

#[tokio::test]
async fn delete_user_removes_account_and_content() {
    let app = spawn_app().await;
    let client = app.logged_in("erin").await;
    let post = app.create_post(&client, "Bye").await;

    let response = client
        .delete(app.url("/api/v1/accounts/users"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    let tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outstanding_tokens")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
    assert_eq!(tokens, 0);

    let response = reqwest::Client::new()
        .get(app.url(&format!("/api/v1/boards/posts/{}", post["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());

    let login = app.login(&browser(), "erin", PASSWORD).await;
    assert_eq!(401, login.status().as_u16());
}

// --- Email verification ---

#[tokio::test]
async fn verification_flow_activates_account_once() {
    let app = spawn_app_with(|c| c.application.require_email_verification = true).await;
    let client = browser();

    let response = app.register(&client, "frank").await;
    assert_eq!(201, response.status().as_u16());
    let user_id = response.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    // inactive accounts cannot log in
    let login = app.login(&client, "frank", PASSWORD).await;
    assert_eq!(401, login.status().as_u16());

    let token: String = sqlx::query_scalar("SELECT token FROM verification_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&app.db_pool)
        .await
        .expect("verification token stored");
    let link = app.url(&format!(
        "/api/v1/accounts/activate/{}/{}",
        encode_uid(user_id),
        token
    ));

    // a leftover Authorization header does not matter to the link
    let response = client.get(&link).bearer_auth("stale.access.token").send().await.unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "frank email verification completed.");

    assert_eq!(200, app.login(&client, "frank", PASSWORD).await.status().as_u16());

    // the link only works once
    let again = client.get(&link).send().await.unwrap();
    assert_eq!(400, again.status().as_u16());
}

#[tokio::test]
async fn activation_rejects_bad_links() {
    let app = spawn_app_with(|c| c.application.require_email_verification = true).await;
    let client = browser();
    let response = app.register(&client, "gina").await;
    let user_id = response.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let undecodable = client
        .get(app.url("/api/v1/accounts/activate/!!!/whatever"))
        .send()
        .await
        .unwrap();
    assert_eq!(404, undecodable.status().as_u16());

    let unknown_user = client
        .get(app.url(&format!("/api/v1/accounts/activate/{}/whatever", encode_uid(9999))))
        .send()
        .await
        .unwrap();
    assert_eq!(404, unknown_user.status().as_u16());

    let wrong_token = client
        .get(app.url(&format!("/api/v1/accounts/activate/{}/wrong", encode_uid(user_id))))
        .send()
        .await
        .unwrap();
    assert_eq!(400, wrong_token.status().as_u16());
}

#[tokio::test]
async fn failed_token_write_leaves_no_account_behind() {
    let app = spawn_app_with(|c| c.application.require_email_verification = true).await;
    sqlx::query("DROP TABLE verification_tokens")
        .execute(&app.db_pool)
        .await
        .unwrap();

    let response = app.register(&browser(), "henry").await;
    assert_eq!(500, response.status().as_u16());

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
}

#[tokio::test]
async fn failed_activation_keeps_the_token() {
    let app = spawn_app_with(|c| c.application.require_email_verification = true).await;
    let client = browser();
    let response = app.register(&client, "irene").await;
    let user_id = response.json::<Value>().await.unwrap()["id"].as_i64().unwrap();
    let token: String = sqlx::query_scalar("SELECT token FROM verification_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    let link = app.url(&format!(
        "/api/v1/accounts/activate/{}/{}",
        encode_uid(user_id),
        token
    ));

    // make the account update fail after the token was consumed
    sqlx::query("ALTER TABLE users RENAME COLUMN is_active TO is_active_old")
        .execute(&app.db_pool)
        .await
        .unwrap();
    let failed = client.get(&link).send().await.unwrap();
    assert_eq!(500, failed.status().as_u16());
    sqlx::query("ALTER TABLE users RENAME COLUMN is_active_old TO is_active")
        .execute(&app.db_pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verification_tokens")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);

    let retry = client.get(&link).send().await.unwrap();
    assert_eq!(200, retry.status().as_u16());
}
