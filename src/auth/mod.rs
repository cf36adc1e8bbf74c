use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod jwks;

pub use jwks::JwksVerifier;

/// Claims carried by the identity provider's access tokens. Ownership
/// comparisons use `name` when present, falling back to `sub`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
}

/// The identity asserted by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    /// The string compared against entity ownership fields.
    pub identity: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        let identity = claims.name.unwrap_or_else(|| claims.sub.clone());
        Self { subject: claims.sub, identity }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    MissingToken(String),
    #[error("{0}")]
    InvalidToken(String),
    #[error("{0}")]
    KeyFetch(String),
}

/// Verifies a bearer token and yields the principal it asserts. The
/// production implementation checks RS256 signatures against the identity
/// provider's published keys; tests substitute a fixed-token fake.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}
