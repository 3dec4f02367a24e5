#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use deck_api::auth::{encode_token, HmacVerifier, ProviderClaims, ProviderIdentityResolver};
use deck_api::database::MemoryStore;
use deck_api::{create_router, AppState};

pub const SECRET: &str = "integration-test-secret";

/// Router over a fresh in-memory store, driven without a socket
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(false)
    }

    pub fn with_auto_provision() -> Self {
        Self::build(true)
    }

    fn build(auto_provision: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let verifier = HmacVerifier::new(SECRET, None, 0).expect("verifier");
        let resolver = ProviderIdentityResolver::new(Arc::new(verifier), store.clone())
            .with_auto_provision(auto_provision);
        let state = AppState::new(store.clone(), Arc::new(resolver));
        Self {
            router: create_router(state),
            store,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Register an account for `subject` and return its token and account id
    pub async fn signup(&self, subject: &str) -> Result<(String, String)> {
        let token = token(subject);
        let (status, body) = self
            .post(
                "/accounts",
                &token,
                serde_json::json!({ "display_name": subject, "email": format!("{}@example.com", subject) }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "signup failed: {} {}", status, body);
        let id = body["data"]["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("account id missing"))?
            .to_string();
        Ok((token, id))
    }
}

pub fn token(subject: &str) -> String {
    encode_token(&ProviderClaims::new(subject, Duration::minutes(10)), SECRET).expect("token")
}

pub fn token_with_profile(subject: &str, name: &str, email: &str) -> String {
    let claims = ProviderClaims::new(subject, Duration::minutes(10)).with_profile(name, email);
    encode_token(&claims, SECRET).expect("token")
}

pub fn assert_error(body: &Value, code: &str) {
    assert_eq!(body["error"], true, "not an error envelope: {}", body);
    assert_eq!(body["code"], code, "unexpected code in {}", body);
}
