//! HTTP-level integration tests for the `/api/auth` endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, delete_json_auth, expect_json, get, get_auth, post_auth, post_json, put_json_auth,
    register, PASSWORD,
};
use roadmap_db::repositories::SessionRepo;
use serde_json::json;
use sqlx::SqlitePool;

async fn login(app: axum::Router, email: &str, password: &str) -> axum::response::Response {
    post_json(app, "/api/auth/login", json!({ "email": email, "password": password })).await
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_returns_token_and_user(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let body = json!({
        "username": "ada",
        "email": "Ada@Example.com",
        "password": PASSWORD,
        "displayName": "Ada L.",
    });

    let json = expect_json(post_json(app, "/api/auth/register", body).await, StatusCode::CREATED).await;

    assert_eq!(json["success"], true);
    assert!(json["token"].is_string());
    assert_eq!(json["user"]["username"], "ada");
    assert_eq!(json["user"]["email"], "ada@example.com");
    assert_eq!(json["user"]["displayName"], "Ada L.");
    assert_eq!(json["user"]["role"], "user");
    assert!(json["user"].get("passwordHash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_opens_a_session(pool: SqlitePool) {
    let app = common::build_test_app(pool.clone());
    let (_, user_id) = register(app, "ada").await;

    let session = SessionRepo::get_active_session(&pool, user_id).await.unwrap();
    assert!(session.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_registration_is_rejected(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    register(app.clone(), "ada").await;

    let body = json!({ "username": "ada", "email": "other@example.com", "password": PASSWORD });
    let json = expect_json(post_json(app, "/api/auth/register", body).await, StatusCode::BAD_REQUEST).await;

    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_registration_input_is_rejected(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let bad_email = json!({ "username": "ada", "email": "not-an-email", "password": PASSWORD });
    let json = expect_json(
        post_json(app.clone(), "/api/auth/register", bad_email).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let short_password = json!({ "username": "ada", "email": "ada@example.com", "password": "abc" });
    let response = post_json(app, "/api/auth/register", short_password).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_json_is_a_bad_request(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/auth/register", json!({ "username": "ada" })).await;

    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_success_records_last_login(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    register(app.clone(), "ada").await;

    let json = expect_json(login(app, "ADA@example.com", PASSWORD).await, StatusCode::OK).await;

    assert!(json["token"].is_string());
    assert_eq!(json["user"]["username"], "ada");
    assert!(json["user"]["lastLoginAt"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_with_bad_credentials_returns_401(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    register(app.clone(), "ada").await;

    let response = login(app.clone(), "ada@example.com", "wrong-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = login(app, "nobody@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_account_cannot_log_in(pool: SqlitePool) {
    let app = common::build_test_app(pool.clone());
    let (token, user_id) = register(app.clone(), "ada").await;
    sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let json = expect_json(
        login(app.clone(), "ada@example.com", PASSWORD).await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
    assert_eq!(json["message"], "Account is deactivated");

    // A wrong password gets the generic answer, not the account state.
    let json = expect_json(
        login(app.clone(), "ada@example.com", "wrong-password").await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
    assert_eq!(json["message"], "Invalid credentials");

    // Existing tokens stop working too.
    let response = get_auth(app, "/api/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_replaces_the_active_session(pool: SqlitePool) {
    let app = common::build_test_app(pool.clone());
    let (_, user_id) = register(app.clone(), "ada").await;
    let first = SessionRepo::get_active_session(&pool, user_id).await.unwrap().unwrap();

    login(app, "ada@example.com", PASSWORD).await;

    let second = SessionRepo::get_active_session(&pool, user_id).await.unwrap().unwrap();
    assert_ne!(first.id, second.id);
    let first = SessionRepo::find_by_id(&pool, first.id).await.unwrap().unwrap();
    assert!(!first.is_active);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_ends_the_active_session(pool: SqlitePool) {
    let app = common::build_test_app(pool.clone());
    let (token, user_id) = register(app.clone(), "ada").await;

    let json = expect_json(post_auth(app, "/api/auth/logout", &token).await, StatusCode::OK).await;

    assert_eq!(json["message"], "Logged out successfully");
    assert!(SessionRepo::get_active_session(&pool, user_id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Authenticated account routes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_requires_a_valid_token(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let (token, user_id) = register(app.clone(), "ada").await;

    let response = get(app.clone(), "/api/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app.clone(), "/api/auth/me", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = expect_json(get_auth(app, "/api/auth/me", &token).await, StatusCode::OK).await;
    assert_eq!(json["data"]["id"], user_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_profile_changes_fields_and_preferences(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let (token, _) = register(app.clone(), "ada").await;
    let body = json!({
        "displayName": "Countess",
        "bio": "Writes programs",
        "preferences": { "darkMode": true, "publicProfile": false },
    });

    let json = expect_json(
        put_json_auth(app, "/api/auth/profile", body, &token).await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(json["data"]["displayName"], "Countess");
    assert_eq!(json["data"]["bio"], "Writes programs");
    assert_eq!(json["data"]["preferences"]["darkMode"], true);
    assert_eq!(json["data"]["preferences"]["publicProfile"], false);
    assert_eq!(json["data"]["preferences"]["emailNotifications"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn change_password_checks_the_current_one(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let (token, _) = register(app.clone(), "ada").await;

    let wrong = json!({ "currentPassword": "nope", "newPassword": "brand-new-pass" });
    let json = expect_json(
        put_json_auth(app.clone(), "/api/auth/password", wrong, &token).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["message"], "Current password is incorrect");

    let right = json!({ "currentPassword": PASSWORD, "newPassword": "brand-new-pass" });
    let response = put_json_auth(app.clone(), "/api/auth/password", right, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(app.clone(), "ada@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = login(app, "ada@example.com", "brand-new-pass").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_account_requires_password(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let (token, _) = register(app.clone(), "ada").await;

    let response = delete_json_auth(app.clone(), "/api/auth/account", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        delete_json_auth(app.clone(), "/api/auth/account", json!({ "password": "nope" }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        delete_json_auth(app.clone(), "/api/auth/account", json!({ "password": PASSWORD }), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["success"], true);

    let response = get_auth(app.clone(), "/api/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = login(app, "ada@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
