use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{AuthConfig, IdentityConfig};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Account signup and credential exchange, delegated to the external identity
/// provider. The API never sees or stores passwords beyond forwarding them.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a provider-side account. Returns the provider's response body.
    async fn signup(&self, email: &str, password: &str) -> Result<Value, IdentityError>;

    /// Exchange credentials for tokens (password grant). Returns the
    /// provider's token response body.
    async fn login(&self, username: &str, password: &str) -> Result<Value, IdentityError>;
}

/// Auth0-style hosted provider: signup via `/dbconnections/signup`, login via
/// the `/oauth/token` password grant.
pub struct HostedIdentityProvider {
    signup_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    connection: String,
    http: reqwest::Client,
}

impl HostedIdentityProvider {
    pub fn new(auth: &AuthConfig, identity: &IdentityConfig) -> Self {
        Self {
            signup_url: provider_endpoint(&auth.issuer, "dbconnections/signup"),
            token_url: provider_endpoint(&auth.issuer, "oauth/token"),
            client_id: identity.client_id.clone(),
            client_secret: identity.client_secret.clone(),
            connection: identity.connection.clone(),
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, IdentityError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(format!("unreadable provider response: {}", e)))?;

        if !status.is_success() {
            let message = payload
                .get("description")
                .or_else(|| payload.get("error_description"))
                .or_else(|| payload.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("unspecified provider error")
                .to_string();
            return Err(IdentityError::Rejected { status: status.as_u16(), message });
        }

        Ok(payload)
    }
}

fn provider_endpoint(issuer: &str, path: &str) -> String {
    match url::Url::parse(issuer).and_then(|base| base.join(path)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}/{}", issuer.trim_end_matches('/'), path),
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn signup(&self, email: &str, password: &str) -> Result<Value, IdentityError> {
        self.post(
            &self.signup_url,
            &json!({
                "client_id": self.client_id,
                "email": email,
                "password": password,
                "connection": self.connection,
            }),
        )
        .await
    }

    async fn login(&self, username: &str, password: &str) -> Result<Value, IdentityError> {
        self.post(
            &self.token_url,
            &json!({
                "grant_type": "password",
                "scope": "openid profile",
                "username": username,
                "password": password,
                "client_id": self.client_id,
                "client_secret": self.client_secret,
            }),
        )
        .await
    }
}
