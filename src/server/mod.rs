//! Demo API validating Auth0 access tokens.
//!
//! The API is what the interceptor's bearer tokens are sent to: an `axum`
//! router whose single endpoint accepts a request only when it carries a valid
//! access token for the configured audience.
//!
//! - [`jwks`] - JWKS fetching and caching
//! - [`validation`] - signature and claims validation
//! - [`extractors`] - `BearerToken` and `ValidatedToken` extractors
//! - [`api`] - the router
//!
//! Only available with the `server` feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use rxauth0::server::{ApiConfig, ApiState, api_router};
//!
//! let config = ApiConfig::from_env().expect("AUTH0_DOMAIN and AUTH0_AUDIENCE");
//! let app = api_router(ApiState::new(config));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod api;
pub mod claims;
pub mod extractors;
pub mod jwks;
pub mod validation;

use serde::{Deserialize, Serialize};

// Re-export commonly used types and functions
pub use api::{VALIDATED_MESSAGE, api_router};
pub use claims::AccessTokenClaims;
pub use extractors::{ApiRejection, ApiState, BearerToken, ValidatedToken};
pub use jwks::{Jwk, JwksCache, JwksError};
pub use validation::{ValidationError, validate_access_token};

/// Tenant and audience the API accepts tokens for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Auth0 tenant domain (e.g., "tenant.auth0.com")
    pub domain: String,
    /// API identifier tokens must be issued for
    pub audience: String,
}

impl ApiConfig {
    pub fn new(domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            audience: audience.into(),
        }
    }

    /// Loads `AUTH0_DOMAIN` and `AUTH0_AUDIENCE` from the compile-time
    /// environment.
    pub fn from_env() -> Option<Self> {
        let domain = option_env!("AUTH0_DOMAIN").filter(|v| !v.is_empty())?;
        let audience = option_env!("AUTH0_AUDIENCE").filter(|v| !v.is_empty())?;
        Some(Self::new(domain, audience))
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }
}
