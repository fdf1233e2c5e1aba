//! ID token claims as exposed by the authentication client.
//!
//! The wrapped client has already validated the ID token by the time it hands
//! these out; this module only gives them a typed shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Audience claim: a single client ID or a list of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(a) => a == audience,
            Audience::Multiple(list) => list.iter().any(|a| a == audience),
        }
    }
}

/// Claims decoded from the ID token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// The encoded ID token itself
    #[serde(rename = "__raw")]
    pub raw: String,

    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Authorized party
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Auth0 session ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdTokenClaims {
    /// Returns true if the token's `exp` lies before `now` (seconds since epoch).
    ///
    /// Tokens without `exp` never expire by this check.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}
