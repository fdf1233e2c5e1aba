//! Authentication extractors for Axum request handling.

use crate::server::claims::AccessTokenClaims;
use crate::server::jwks::JwksCache;
use crate::server::validation::validate_access_token;
use crate::server::ApiConfig;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Rejection type for authentication extraction failures.
#[derive(Debug)]
pub enum ApiRejection {
    MissingAuthorizationHeader,

    /// Header is not valid ASCII or not a `Bearer` credential
    InvalidAuthorizationHeader,

    InvalidBearerToken,

    TokenValidationFailed,
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiRejection::MissingAuthorizationHeader => {
                (StatusCode::UNAUTHORIZED, "Missing Authorization header")
            }
            ApiRejection::InvalidAuthorizationHeader => (
                StatusCode::BAD_REQUEST,
                "Invalid Authorization header format",
            ),
            ApiRejection::InvalidBearerToken => (StatusCode::UNAUTHORIZED, "Invalid Bearer token"),
            ApiRejection::TokenValidationFailed => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token")
            }
        };
        (status, message).into_response()
    }
}

/// Raw bearer token from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(AUTHORIZATION) else {
            tracing::warn!("No Authorization header found");
            return Err(ApiRejection::MissingAuthorizationHeader);
        };

        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiRejection::InvalidAuthorizationHeader)?;

        let Some(token) = auth_str.strip_prefix("Bearer ") else {
            tracing::warn!("Authorization header missing 'Bearer ' prefix");
            return Err(ApiRejection::InvalidAuthorizationHeader);
        };
        if token.is_empty() {
            return Err(ApiRejection::InvalidBearerToken);
        }

        tracing::trace!("Extracted Bearer token: {} chars", token.len());
        Ok(BearerToken(token.to_string()))
    }
}

/// State the [`ValidatedToken`] extractor needs.
#[derive(Clone)]
pub struct ApiState {
    pub config: ApiConfig,
    pub jwks_cache: Arc<JwksCache>,
}

impl ApiState {
    pub fn new(config: ApiConfig) -> Self {
        let jwks_cache = Arc::new(JwksCache::new(&config));
        Self { config, jwks_cache }
    }

    pub fn with_jwks(config: ApiConfig, jwks_cache: JwksCache) -> Self {
        Self {
            config,
            jwks_cache: Arc::new(jwks_cache),
        }
    }
}

/// Claims of a bearer token that passed validation.
///
/// # Example
///
/// ```rust,ignore
/// async fn messages(ValidatedToken(claims): ValidatedToken) -> String {
///     format!("Hello, {}", claims.sub)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ValidatedToken(pub AccessTokenClaims);

impl<S> FromRequestParts<S> for ValidatedToken
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer_token = BearerToken::from_request_parts(parts, state).await?;
        let api = ApiState::from_ref(state);

        let claims = validate_access_token(&bearer_token.0, &api.config, &api.jwks_cache)
            .await
            .map_err(|e| {
                tracing::warn!("JWT validation failed: {}", e);
                ApiRejection::TokenValidationFailed
            })?;

        Ok(ValidatedToken(claims))
    }
}
