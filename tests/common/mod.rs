// tests/common/mod.rs

#![allow(dead_code)]

use portfolio_backend::{
    config::{AdminSeed, Config},
    routes,
    state::AppState,
};
use serde_json::{Value, json};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";
pub const ADMIN_EMAIL: &str = "admin@portfolio.local";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestApp {
    pub address: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port over a fresh in-memory store, with an
/// admin account seeded.
pub async fn spawn_app() -> TestApp {
    let mut config = Config::for_memory(JWT_SECRET);
    config.admin = Some(AdminSeed {
        username: "admin".to_string(),
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    });

    let state = AppState::in_memory(config);
    state.seed_admin().await.expect("Failed to seed admin");

    let app = routes::create_router(state.clone());

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        state,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Register failed")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login failed")
    }

    /// Registers a fresh user and returns `(token, user_id)`.
    pub async fn new_user(&self) -> (String, i64) {
        let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let email = format!("{}@example.com", username);
        let password = "password123";

        let resp = self.register(&username, &email, password).await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        let id = body["user"]["id"].as_i64().expect("user id");

        (self.token_for(&email, password).await, id)
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn token_for(&self, email: &str, password: &str) -> String {
        let body: Value = self.login(email, password).await.json().await.unwrap();
        body["token"].as_str().expect("Token not found").to_string()
    }

    pub async fn create_portfolio(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/portfolio"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Create failed")
    }

    /// Creates a portfolio expected to succeed and returns its JSON.
    pub async fn portfolio(&self, token: &str, title: &str, visibility: &str) -> Value {
        let resp = self
            .create_portfolio(
                token,
                json!({
                    "title": title,
                    "description": "A project",
                    "category": "web-development",
                    "visibility": visibility,
                }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        body["portfolio"].clone()
    }

    pub async fn get_json(&self, path: &str, token: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed");
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }
}
