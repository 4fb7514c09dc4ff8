#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, TimeZone, Utc};
use hdnotes::{
    api::{
        self,
        email::LogEmailSender,
        handlers::auth::{AuthConfig, AuthState, WindowRateLimiter},
    },
    clock::ManualClock,
    store::{MemoryStore, UserStore},
};
use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

struct Server {
    base: String,
    client: Client,
    store: MemoryStore,
    clock: Arc<ManualClock>,
}

impl Server {
    async fn spawn() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap(),
        ));
        let store = MemoryStore::with_clock(clock.clone());
        let config = AuthConfig::new("http://localhost:5173".to_string());
        let limiter = Arc::new(WindowRateLimiter::new(
            config.rate_limit_max(),
            config.rate_limit_window_seconds(),
            clock.clone(),
        ));
        let state = Arc::new(AuthState::new(
            config,
            &SecretString::from("integration-secret".to_string()),
            Arc::new(store.clone()),
            Arc::new(LogEmailSender),
            limiter,
            clock.clone(),
        ));
        let app = api::app(state, Arc::new(store.clone())).expect("app");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("serve");
        });

        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
            store,
            clock,
        }
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = self.client.post(format!("{}{path}", self.base)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("send");
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn post_forwarded(&self, path: &str, forwarded_for: &str, body: Value) -> StatusCode {
        self.client
            .post(format!("{}{path}", self.base))
            .header("x-forwarded-for", forwarded_for)
            .json(&body)
            .send()
            .await
            .expect("send")
            .status()
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base))
            .bearer_auth(token)
            .send()
            .await
            .expect("send");
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .put(format!("{}{path}", self.base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("send");
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn pending_code(&self, email: &str) -> String {
        self.store
            .find_by_email(email)
            .await
            .unwrap()
            .and_then(|user| user.challenge)
            .map(|challenge| challenge.code)
            .expect("pending challenge")
    }

    async fn sign_up(&self, email: &str, username: &str) -> String {
        let (status, _) = self
            .post(
                "/auth/signup",
                None,
                json!({"username": username, "email": email, "dateOfBirth": "1992-03-04"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let code = self.pending_code(email).await;
        let (status, body) = self
            .post("/auth/verify-otp", None, json!({"email": email, "otp": code}))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn signup_login_and_profile() {
    let server = Server::spawn().await;
    let first = server.sign_up("grace@example.com", "Grace").await;

    let (status, body) = server
        .post("/auth/login", None, json!({"email": "Grace@Example.com"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP sent to your email");

    let code = server.pending_code("grace@example.com").await;
    let (status, body) = server
        .post(
            "/auth/verify-login-otp",
            None,
            json!({"email": "grace@example.com", "otp": code}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    let second = body["token"].as_str().unwrap().to_string();

    // Both sessions stay valid; tokens are stateless.
    for token in [&first, &second] {
        let (status, body) = server.get("/user/profile", token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to your profile");
        assert_eq!(body["user"]["email"], "grace@example.com");
        assert_eq!(body["user"]["dateOfBirth"], "1992-03-04");
    }

    let (status, body) = server.post("/auth/logout", None, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");
}

#[tokio::test]
async fn expired_code_and_expired_session() {
    let server = Server::spawn().await;
    let token = server.sign_up("linus@example.com", "Linus").await;

    let (status, _) = server
        .post("/auth/login", None, json!({"email": "linus@example.com"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let code = server.pending_code("linus@example.com").await;

    server.clock.advance(Duration::seconds(300));
    let (status, body) = server
        .post(
            "/auth/verify-login-otp",
            None,
            json!({"email": "linus@example.com", "otp": code}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "OTP expired");

    server.clock.advance(Duration::seconds(604_800));
    let (status, body) = server.get("/notes", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn notes_paging_search_and_archive() {
    let server = Server::spawn().await;
    let token = server.sign_up("ken@example.com", "Ken").await;

    for index in 0..12 {
        server.clock.advance(Duration::seconds(1));
        let (status, _) = server
            .post(
                "/notes",
                Some(&token),
                json!({"title": format!("Note {index}"), "content": if index % 2 == 0 { "even Rust" } else { "odd" }}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = server.get("/notes?page=2&limit=5", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"].as_array().map(Vec::len), Some(5));
    assert_eq!(body["notes"][0]["title"], "Note 6");
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["hasNext"], true);
    assert_eq!(body["pagination"]["hasPrev"], true);

    let (status, body) = server.get("/notes?search=rust", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalNotes"], 6);

    let note_id = body["notes"][0]["id"].as_str().unwrap().to_string();
    let (status, body) = server
        .put(
            &format!("/notes/{note_id}"),
            &token,
            json!({"isArchived": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["isArchived"], true);

    let (_, body) = server.get("/notes?archived=true", &token).await;
    assert_eq!(body["pagination"]["totalNotes"], 1);
    let (_, body) = server.get("/notes?archived=false", &token).await;
    assert_eq!(body["pagination"]["totalNotes"], 11);

    let (status, body) = server
        .put(&format!("/notes/{note_id}"), &token, json!({"title": "   "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "title");
}

#[tokio::test]
async fn auth_throttle_per_client_address() {
    let server = Server::spawn().await;
    for attempt in 0..10 {
        let status = server
            .post_forwarded(
                "/auth/verify-otp",
                &format!("198.51.100.{attempt}"),
                json!({"email": format!("user{attempt}@example.com"), "otp": "123456"}),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, body) = server
        .post("/auth/login", None, json!({"email": "nobody@example.com"}))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Too many requests, please try again later");

    server.clock.advance(Duration::seconds(900));
    let (status, _) = server
        .post("/auth/login", None, json!({"email": "nobody@example.com"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
