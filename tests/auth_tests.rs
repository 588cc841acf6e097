// tests/auth_tests.rs

mod common;

use chrono::Utc;
use common::{JWT_SECRET, spawn_app};
use portfolio_backend::utils::jwt::{Claims, encode_claims, sign_jwt};
use serde_json::{Value, json};

#[tokio::test]
async fn health_endpoints_report_healthy() {
    let app = spawn_app().await;

    for path in ["/health", "/api/health"] {
        let resp = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
    }
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = spawn_app().await;

    let resp = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn register_normalizes_email_and_hides_password() {
    let app = spawn_app().await;

    let resp = app.register("mixedcase", "Mixed.Case@Example.COM", "password123").await;
    assert_eq!(resp.status().as_u16(), 201);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["email"], "mixed.case@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["isActive"], true);
    assert!(body["user"].get("password").is_none());

    // Login is case-insensitive on email.
    let login = app.login("MIXED.case@example.com", "password123").await;
    assert_eq!(login.status().as_u16(), 200);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    // Username too short
    let resp = app.register("yo", "yo@example.com", "password123").await;
    assert_eq!(resp.status().as_u16(), 400);

    // Padding does not count towards the length
    let resp = app.register("  ab  ", "ab@example.com", "password123").await;
    assert_eq!(resp.status().as_u16(), 400);

    // Missing email entirely
    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": "valid_name", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn usernames_are_stored_trimmed() {
    let app = spawn_app().await;

    let resp = app.register("  padded  ", "padded@example.com", "password123").await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["username"], "padded");

    let token = app.token_for("padded@example.com", "password123").await;
    let resp = app
        .client
        .put(app.url("/api/auth/profile"))
        .bearer_auth(&token)
        .json(&json!({ "username": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let (_, profile) = app.get_json("/api/auth/profile", &token).await;
    assert_eq!(profile["user"]["username"], "padded");
}

#[tokio::test]
async fn duplicate_username_or_email_conflicts() {
    let app = spawn_app().await;

    assert_eq!(app.register("taken", "taken@example.com", "password123").await.status().as_u16(), 201);
    assert_eq!(app.register("taken", "other@example.com", "password123").await.status().as_u16(), 409);
    assert_eq!(app.register("other", "TAKEN@example.com", "password123").await.status().as_u16(), 409);
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_inactive_accounts() {
    let app = spawn_app().await;
    app.register("carol", "carol@example.com", "password123").await;

    let ok: Value = app.login("carol@example.com", "password123").await.json().await.unwrap();
    assert!(ok["token"].as_str().is_some());
    assert!(ok["user"]["lastLogin"].is_string());

    assert_eq!(app.login("carol@example.com", "wrong-pass").await.status().as_u16(), 401);
    assert_eq!(app.login("nobody@example.com", "password123").await.status().as_u16(), 401);

    let id = ok["user"]["id"].as_i64().unwrap();
    app.state.users.set_active(id, false).await.unwrap();
    assert_eq!(app.login("carol@example.com", "password123").await.status().as_u16(), 401);
}

#[tokio::test]
async fn profile_requires_a_valid_token() {
    let app = spawn_app().await;
    let (token, id) = app.new_user().await;

    let resp = app.client.get(app.url("/api/auth/profile")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let (status, body) = app.get_json("/api/auth/profile", &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["id"], id);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = spawn_app().await;
    let (_, id) = app.new_user().await;

    let now = Utc::now().timestamp();
    let expired = encode_claims(
        &Claims {
            sub: id.to_string(),
            iat: now - 2 * 86_400,
            exp: now - 86_400,
        },
        JWT_SECRET,
    )
    .unwrap();

    let (status, _) = app.get_json("/api/auth/profile", &expired).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn tampered_or_foreign_tokens_are_rejected() {
    let app = spawn_app().await;
    let (token, _) = app.new_user().await;

    let mut tampered = token.clone();
    tampered.pop();
    tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
    assert_eq!(app.get_json("/api/auth/profile", &tampered).await.0, 401);

    let foreign = sign_jwt(1, "some-other-secret", 3600).unwrap();
    assert_eq!(app.get_json("/api/auth/profile", &foreign).await.0, 401);

    assert_eq!(app.get_json("/api/auth/profile", "not-a-jwt").await.0, 401);
}

#[tokio::test]
async fn token_of_deactivated_user_is_rejected() {
    let app = spawn_app().await;
    let (token, id) = app.new_user().await;

    app.state.users.set_active(id, false).await.unwrap();

    assert_eq!(app.get_json("/api/auth/profile", &token).await.0, 401);
}

#[tokio::test]
async fn api_key_lifecycle() {
    let app = spawn_app().await;
    let (token, _) = app.new_user().await;

    let resp = app
        .client
        .post(app.url("/api/auth/generate-api-key"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    let key = body["apiKey"].as_str().unwrap().to_string();
    assert!(key.starts_with("pk_26466_"));

    // Profile reports an active key without revealing it.
    let (_, profile) = app.get_json("/api/auth/profile", &token).await;
    assert_eq!(profile["user"]["apiKeyActive"], true);
    assert!(profile["user"].get("apiKey").is_none());

    let with_key = |key: String| {
        app.client
            .get(app.url("/api/portfolio/public/all"))
            .header("X-API-Key", key)
            .send()
    };

    assert_eq!(with_key(key.clone()).await.unwrap().status().as_u16(), 200);
    assert_eq!(with_key("pk_live_wrongprefix".to_string()).await.unwrap().status().as_u16(), 401);
    assert_eq!(
        with_key(format!("pk_26466_{}", "0".repeat(64))).await.unwrap().status().as_u16(),
        401
    );

    let resp = app
        .client
        .delete(app.url("/api/auth/revoke-api-key"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    assert_eq!(with_key(key).await.unwrap().status().as_u16(), 401);
}

#[tokio::test]
async fn api_key_cannot_reach_bearer_only_routes() {
    let app = spawn_app().await;
    let (token, _) = app.new_user().await;

    let body: Value = app
        .client
        .post(app.url("/api/auth/generate-api-key"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let key = body["apiKey"].as_str().unwrap();

    let resp = app
        .client
        .get(app.url("/api/portfolio"))
        .header("X-API-Key", key)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let app = spawn_app().await;
    app.register("dave", "dave@example.com", "password123").await;
    let token = app.token_for("dave@example.com", "password123").await;

    let update = |body: Value| {
        app.client
            .put(app.url("/api/auth/profile"))
            .bearer_auth(&token)
            .json(&body)
            .send()
    };

    let resp = update(json!({ "newPassword": "brand-new-pass" })).await.unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = update(json!({ "currentPassword": "wrong", "newPassword": "brand-new-pass" }))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = update(json!({
        "username": "david",
        "currentPassword": "password123",
        "newPassword": "brand-new-pass"
    }))
    .await
    .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["username"], "david");

    assert_eq!(app.login("dave@example.com", "password123").await.status().as_u16(), 401);
    assert_eq!(app.login("dave@example.com", "brand-new-pass").await.status().as_u16(), 200);
}

#[tokio::test]
async fn profile_edit_cannot_take_another_users_email() {
    let app = spawn_app().await;
    app.register("erin", "erin@example.com", "password123").await;
    let (token, _) = app.new_user().await;

    let resp = app
        .client
        .put(app.url("/api/auth/profile"))
        .bearer_auth(&token)
        .json(&json!({ "email": "Erin@Example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}
