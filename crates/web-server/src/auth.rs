use crate::{error::ApiError, AppState};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use database::{DbError, Repository};
use std::sync::Arc;

/// Resolves a bearer token to a username. Token issuance lives outside
/// this service; all the route layer needs is this one capability.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<String>, DbError>;
}

/// The default resolver: tokens are opaque session keys looked up in the
/// sessions table.
pub struct SessionResolver {
    repo: Repository,
}

impl SessionResolver {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl IdentityResolver for SessionResolver {
    async fn resolve(&self, token: &str) -> Result<Option<String>, DbError> {
        self.repo.resolve_session(token).await
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`. An absent
/// header, a missing `Bearer ` prefix, or an empty token are all the same
/// malformed-request case.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::TokenMissing)?;
    let token = header.strip_prefix("Bearer ").ok_or(ApiError::TokenMissing)?;
    if token.is_empty() {
        return Err(ApiError::TokenMissing);
    }
    Ok(token)
}

/// Extractor for routes that require an authenticated caller. Handlers
/// taking an `AuthUser` receive the resolved username; rejection goes
/// through the same classification as every other failure.
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        match state.identity.resolve(token).await? {
            Some(username) if !username.is_empty() => Ok(AuthUser(username)),
            _ => Err(ApiError::InvalidToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn absent_header_is_token_missing() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.classify(), (400, "Token is missing.".to_string()));
    }

    #[test]
    fn missing_bearer_prefix_is_token_missing() {
        let err = bearer_token(&headers_with("Basic abc123")).unwrap_err();
        assert_eq!(err.classify(), (400, "Token is missing.".to_string()));
    }

    #[test]
    fn empty_token_is_token_missing() {
        assert!(bearer_token(&headers_with("Bearer ")).is_err());
    }

    #[test]
    fn well_formed_header_yields_the_token() {
        assert_eq!(bearer_token(&headers_with("Bearer abc123")).unwrap(), "abc123");
    }
}
