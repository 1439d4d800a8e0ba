//! Shared harness for the end-to-end tests: the full router over a fresh
//! memory store, driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use api_adapters::{router, AppState};
use auth_adapters::{Argon2Hasher, JwtAuthority};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use storage_adapters::{MemoryStore, Repositories};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"integration-test-secret";
pub const PASSWORD: &str = "Str0ng!pass";

pub struct TestApp {
    pub router: Router,
    /// Same state as the router's store; used for failure injection.
    pub store: MemoryStore,
}

/// A signed-up user and their bearer token.
#[derive(Debug, Clone)]
pub struct Account {
    pub user_id: String,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let repos = Repositories::from_store(Arc::new(store.clone()));
        let state = AppState::new(
            repos,
            Arc::new(Argon2Hasher::low_cost()),
            Arc::new(JwtAuthority::new(TEST_SECRET, 3600)),
        );
        Self { router: router(state, &[]), store }
    }

    pub async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, path: &str, token: &str) -> TestResponse {
        self.send(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> TestResponse {
        self.send(Method::DELETE, path, Some(token), None).await
    }

    pub async fn signup(&self, name: &str, email: &str) -> Account {
        let response = self
            .send(
                Method::POST,
                "/api/users/signup",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "signup failed: {}", response.body);
        Account {
            user_id: response.body["userId"].as_str().unwrap().to_string(),
            token: response.body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates an item and returns its id.
    pub async fn create(&self, collection: &str, account: &Account, body: Value) -> String {
        let response = self.post(&format!("/api/{collection}"), &account.token, body).await;
        assert_eq!(response.status, StatusCode::CREATED, "create failed: {}", response.body);
        response.body["book"]["id"].as_str().unwrap().to_string()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub fn external_book(owner: &Account, book_id: &str) -> Value {
    json!({
        "book_id": book_id,
        "title": format!("Title of {book_id}"),
        "authors": "Au",
        "image": "i",
        "url": "x",
        "user": owner.user_id,
    })
}

pub fn authored_book(owner: &Account, title: &str) -> Value {
    json!({ "data": { "title": title, "pages": 320 }, "user": owner.user_id })
}

/// Ids of the items in a list envelope, in response order.
pub fn ids(body: &Value, key: &str) -> Vec<String> {
    body[key]
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
