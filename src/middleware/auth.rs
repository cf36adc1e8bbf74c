use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};

use crate::auth::{AuthError, Principal};
use crate::error::ApiError;
use crate::state::AppState;

/// Extractor for routes that require a verified principal. Missing or
/// malformed credentials reject with 401 before the handler body runs.
pub struct AuthPrincipal(pub Principal);

/// Extractor for routes whose auth requirement is policy-driven. A missing
/// Authorization header yields `None`; a present-but-invalid token is still
/// rejected with 401 rather than silently downgraded to anonymous.
pub struct MaybePrincipal(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?
            .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;
        let principal = state.verifier.verify(&token).await?;
        Ok(AuthPrincipal(principal))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers)? {
            Some(token) => {
                let principal = state.verifier.verify(&token).await?;
                Ok(MaybePrincipal(Some(principal)))
            }
            None => Ok(MaybePrincipal(None)),
        }
    }
}

/// Extract the bearer token from the Authorization header, if any.
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(auth_header) = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
    else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::MissingToken("invalid Authorization header format".to_string()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            AuthError::MissingToken("Authorization header must use Bearer token format".to_string())
        })?;

    if token.trim().is_empty() {
        return Err(AuthError::MissingToken("empty bearer token".to_string()));
    }
    Ok(Some(token.to_string()))
}
