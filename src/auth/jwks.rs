use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{AuthError, Claims, Principal, TokenVerifier};
use crate::config::AuthConfig;

/// RS256 verifier backed by the identity provider's published JWKS document.
/// Keys are fetched on first use and cached by `kid`; a token referencing an
/// unknown kid forces one refetch before being rejected, so provider key
/// rotation does not require a restart.
pub struct JwksVerifier {
    issuer: String,
    jwks_uri: String,
    audience: Option<String>,
    http: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

impl JwksVerifier {
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            issuer: auth.issuer.clone(),
            jwks_uri: auth.jwks_uri.clone(),
            audience: auth.audience.clone(),
            http: reqwest::Client::new(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        self.refresh_keys().await?;

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key '{}'", kid)))
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        let document: JwksDocument = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("jwks fetch failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AuthError::KeyFetch(format!("jwks fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("jwks parse failed: {}", e)))?;

        let mut keys = self.keys.write().await;
        for jwk in document.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
                continue;
            };
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => {
                    tracing::warn!("skipping unusable jwk '{}': {}", kid, err);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("malformed token header: {}", e)))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header missing kid".to_string()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(Principal::from(data.claims))
    }
}
