//! Claims carried by access tokens issued for the demo API.

use crate::client::claims::Audience;
use serde::{Deserialize, Serialize};

/// Access token claims checked by the API.
///
/// Auth0 sends `aud` as a string, or as an array when the token is also valid
/// for the `/userinfo` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Subject - unique user identifier (e.g., "auth0|123456")
    pub sub: String,

    pub iss: String,

    pub aud: Audience,

    /// Issued at (Unix epoch)
    pub iat: u64,

    /// Expiration (Unix epoch)
    pub exp: u64,

    /// Client the token was issued to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Space-separated granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// RBAC permissions, when enabled on the API
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl AccessTokenClaims {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope
            .as_deref()
            .is_some_and(|scopes| scopes.split_whitespace().any(|s| s == scope))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
