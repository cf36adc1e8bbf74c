#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use casework_api::auth::{AuthError, Principal, TokenVerifier};
use casework_api::config::AppConfig;
use casework_api::identity::{IdentityError, IdentityProvider};
use casework_api::routes;
use casework_api::state::AppState;
use casework_api::store::MemoryStore;

/// Token verifier for tests: any token of the form `valid-<identity>` is
/// accepted and asserts that identity; everything else is rejected.
pub struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        match token.strip_prefix("valid-") {
            Some(identity) if !identity.is_empty() => Ok(Principal {
                subject: format!("auth0|{identity}"),
                identity: identity.to_string(),
            }),
            _ => Err(AuthError::InvalidToken("unknown test token".to_string())),
        }
    }
}

/// Identity provider stub. `fail = true` simulates a provider outage.
pub struct StubIdentityProvider {
    pub fail: bool,
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn signup(&self, email: &str, _password: &str) -> Result<Value, IdentityError> {
        if self.fail {
            return Err(IdentityError::Rejected {
                status: 400,
                message: "signup rejected".to_string(),
            });
        }
        Ok(json!({ "_id": "stub-account", "email": email }))
    }

    async fn login(&self, username: &str, _password: &str) -> Result<Value, IdentityError> {
        if self.fail {
            return Err(IdentityError::Transport("provider unreachable".to_string()));
        }
        Ok(json!({
            "access_token": "stub-access-token",
            "id_token": "stub-id-token",
            "token_type": "Bearer",
            "username": username,
        }))
    }
}

/// Deterministic config for tests regardless of ambient environment.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::from_env();
    config.server.port = 0;
    config.server.public_base_url = None;
    config.pagination.page_size = 5;
    config.pagination.include_total_count = true;
    config.policy.public_program_catalog = true;
    config.policy.public_signup = true;
    config
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), false)
}

pub fn spawn_app_with(config: AppConfig, provider_fails: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(StaticVerifier),
        Arc::new(StubIdentityProvider { fail: provider_fails }),
        config,
    );
    TestApp { router: routes::app(state), store }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&value)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request("GET", uri, token, None).await
    }
}

/// Bearer token accepted by `StaticVerifier` for the given identity.
pub fn token_for(identity: &str) -> String {
    format!("valid-{identity}")
}

/// Pull the opaque cursor out of an absolute `next` URL.
pub fn cursor_from_next(next: &str) -> String {
    next.split("cursor=")
        .nth(1)
        .expect("next URL should embed a cursor")
        .to_string()
}
