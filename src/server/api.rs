//! Demo API protected by access token validation.

use crate::server::extractors::{ApiState, ValidatedToken};
use axum::{Json, Router, routing::get};
use serde::Serialize;

/// Body returned once a request's access token has been validated.
pub const VALIDATED_MESSAGE: &str = "Your access token was successfully validated!";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}

/// Builds the API router: `GET /api/external` answers `200` with a fixed
/// message for a valid bearer token and `401` otherwise.
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/external", get(external))
        .with_state(state)
}

async fn external(ValidatedToken(claims): ValidatedToken) -> Json<MessageResponse> {
    tracing::debug!("Serving external API call for {}", claims.sub);
    Json(MessageResponse {
        msg: VALIDATED_MESSAGE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::validation::test_keys::{claims, config, jwks, sign};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header::AUTHORIZATION};
    use tower::ServiceExt;

    fn router() -> Router {
        api_router(ApiState::with_jwks(config(), jwks()))
    }

    #[tokio::test]
    async fn test_valid_token_gets_message() {
        let token = sign(&claims(&config()));
        let request = Request::get("/api/external")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "msg": VALIDATED_MESSAGE }));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let request = Request::get("/api/external").body(Body::empty()).unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let request = Request::get("/api/external")
            .header(AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let request = Request::get("/api/private").body(Body::empty()).unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
