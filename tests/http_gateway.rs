//! End-to-end HTTP tests: real router on a loopback port, in-memory store

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use simple_bank::Currency;
use simple_bank::gateway::{self, state::AppState};
use simple_bank::store::MemoryStore;
use simple_bank::transfer::{CoordinatorConfig, TransferCoordinator};
use simple_bank::user_auth::UserAuthService;

const SECRET: &str = "test-secret-key-that-is-long-enough-0123";

struct TestServer {
    base: String,
    client: Client,
    store: MemoryStore,
}

impl TestServer {
    async fn start() -> Self {
        let store = MemoryStore::new();
        let shared: Arc<dyn simple_bank::Store> = Arc::new(store.clone());
        let coordinator = Arc::new(TransferCoordinator::new(
            shared.clone(),
            CoordinatorConfig::default(),
        ));
        let user_auth = Arc::new(
            UserAuthService::new(shared.clone(), SECRET.to_string(), Duration::from_secs(60))
                .unwrap(),
        );
        let state = Arc::new(AppState::new(shared, coordinator, user_auth));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(gateway::serve(listener, state));

        Self {
            base: format!("http://{}", addr),
            client: Client::new(),
            store,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Register + login, returning the bearer token
    async fn sign_up(&self, username: &str) -> String {
        let resp = self
            .client
            .post(self.url("/users"))
            .json(&json!({
                "username": username,
                "full_name": "Test User",
                "email": format!("{}@example.com", username),
                "password": "secret123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = self
            .client
            .post(self.url("/users/login"))
            .json(&json!({ "username": username, "password": "secret123" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let resp = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 0);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let server = TestServer::start().await;
    server.sign_up("alice").await;

    let resp = server
        .client
        .post(server.url("/users"))
        .json(&json!({
            "username": "alice",
            "full_name": "Other Alice",
            "email": "other@example.com",
            "password": "secret123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_private_routes_require_token() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/transfers"))
        .json(&json!({"from_account_id": 1, "to_account_id": 2, "amount": 1, "currency": "USD"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = server.get("/accounts/1", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_account_lifecycle() {
    let server = TestServer::start().await;
    let alice = server.sign_up("alice").await;
    let bob = server.sign_up("bob").await;

    let (status, body) = server
        .post("/accounts", &alice, json!({"currency": "EUR"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["balance"], 0);
    assert_eq!(body["data"]["owner"], "alice");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = server
        .post("/accounts", &alice, json!({"currency": "EUR"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = server
        .post("/accounts", &alice, json!({"currency": "GBP"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.get(&format!("/accounts/{}", id), &alice).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get(&format!("/accounts/{}", id), &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server.get("/accounts/999", &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server.get("/accounts?page=1&page_size=5", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = server.get("/accounts?page=1&page_size=50", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transfer_flow() {
    let server = TestServer::start().await;
    let alice = server.sign_up("alice").await;
    let bob = server.sign_up("bob").await;

    let from = server.store.seed_account("alice", Currency::Usd, 100).id;
    let (_, body) = server
        .post("/accounts", &bob, json!({"currency": "USD"}))
        .await;
    let to = body["data"]["id"].as_i64().unwrap();

    let (status, body) = server
        .post(
            "/transfers",
            &alice,
            json!({"from_account_id": from, "to_account_id": to, "amount": 30, "currency": "USD"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["from_account"]["balance"], 70);
    assert_eq!(body["data"]["to_account"]["balance"], 30);
    assert_eq!(body["data"]["from_entry"]["amount"], -30);
    let transfer_id = body["data"]["transfer"]["id"].as_i64().unwrap();

    // Receiver may read the transfer
    let (status, _) = server.get(&format!("/transfers/{}", transfer_id), &bob).await;
    assert_eq!(status, StatusCode::OK);

    // Receiver sees the credit entry
    let (status, body) = server
        .get(&format!("/accounts/{}/entries?page=1&page_size=10", to), &bob)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["amount"], 30);

    // Bob cannot spend from Alice's account
    let (status, _) = server
        .post(
            "/transfers",
            &bob,
            json!({"from_account_id": from, "to_account_id": to, "amount": 1, "currency": "USD"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Overdraft rejected
    let (status, body) = server
        .post(
            "/transfers",
            &alice,
            json!({"from_account_id": from, "to_account_id": to, "amount": 71, "currency": "USD"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1002);

    // Third party can't read it
    let carol = server.sign_up("carol").await;
    let (status, _) = server
        .get(&format!("/transfers/{}", transfer_id), &carol)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_requests_are_bad_request() {
    let server = TestServer::start().await;
    let alice = server.sign_up("alice").await;

    // Missing field
    let (status, body) = server.post("/accounts", &alice, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    // Wrong type
    let (status, body) = server
        .post(
            "/transfers",
            &alice,
            json!({"from_account_id": 1, "to_account_id": "two", "amount": 10, "currency": "USD"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    // Non-positive id rejected before any lookup
    let (status, body) = server
        .post(
            "/transfers",
            &alice,
            json!({"from_account_id": 1, "to_account_id": 0, "amount": 10, "currency": "USD"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    // Non-numeric path and missing query parameters
    let (status, body) = server.get("/accounts/abc", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let (status, body) = server.get("/accounts", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    // Public route: no body at all
    let resp = server
        .client
        .post(server.url("/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 1001);
}
