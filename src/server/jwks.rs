//! Signing keys of the Auth0 tenant, fetched from `/.well-known/jwks.json`.
//!
//! Keys are kept for a TTL. A token signed with an unknown `kid` forces one
//! refetch, so key rotation is picked up without waiting for the TTL.

use crate::server::ApiConfig;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("Failed to fetch JWKS: {0}")]
    FetchError(#[from] reqwest::Error),

    #[error("JWKS endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Failed to parse JWKS: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Key with kid '{0}' not found in JWKS")]
    KeyNotFound(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// One RSA signing key as published by Auth0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,

    /// Auth0 tenants sign with RS256 unless configured otherwise
    #[serde(default)]
    pub alg: Option<String>,

    #[serde(rename = "use", default)]
    pub key_use: Option<String>,

    /// Modulus, base64url
    #[serde(default)]
    pub n: Option<String>,

    /// Exponent, base64url
    #[serde(default)]
    pub e: Option<String>,
}

impl Jwk {
    pub fn to_decoding_key(&self) -> Result<DecodingKey, JwksError> {
        if self.kty != "RSA" {
            return Err(JwksError::InvalidKey(format!(
                "key type '{}' is not RSA",
                self.kty
            )));
        }
        let (Some(n), Some(e)) = (&self.n, &self.e) else {
            return Err(JwksError::InvalidKey(format!(
                "key '{}' has no RSA components",
                self.kid
            )));
        };
        DecodingKey::from_rsa_components(n, e).map_err(|e| JwksError::InvalidKey(e.to_string()))
    }

    pub fn algorithm(&self) -> Result<Algorithm, JwksError> {
        match self.alg.as_deref().unwrap_or("RS256") {
            "RS256" => Ok(Algorithm::RS256),
            "RS384" => Ok(Algorithm::RS384),
            "RS512" => Ok(Algorithm::RS512),
            "PS256" => Ok(Algorithm::PS256),
            "PS384" => Ok(Algorithm::PS384),
            "PS512" => Ok(Algorithm::PS512),
            other => Err(JwksError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Keys marked for encryption are never used to verify signatures.
    fn is_signing_key(&self) -> bool {
        self.key_use.as_deref().is_none_or(|u| u == "sig")
    }
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Default)]
struct KeySet {
    by_kid: HashMap<String, Jwk>,
    fetched_at: Option<Instant>,
}

impl KeySet {
    fn from_keys(keys: Vec<Jwk>, fetched_at: Instant) -> Self {
        let by_kid = keys
            .into_iter()
            .filter(Jwk::is_signing_key)
            .map(|key| (key.kid.clone(), key))
            .collect();
        Self {
            by_kid,
            fetched_at: Some(fetched_at),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.is_none_or(|at| at.elapsed() >= ttl)
    }
}

/// Cached JWKS of one tenant.
pub struct JwksCache {
    jwks_url: String,
    http: reqwest::Client,
    keys: RwLock<KeySet>,
    ttl: Duration,
}

impl JwksCache {
    pub fn new(config: &ApiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new(), DEFAULT_TTL)
    }

    pub fn with_ttl(config: &ApiConfig, ttl: Duration) -> Self {
        Self::with_client(config, reqwest::Client::new(), ttl)
    }

    /// Uses `http` for fetching, e.g. to share a connection pool or set
    /// timeouts.
    pub fn with_client(config: &ApiConfig, http: reqwest::Client, ttl: Duration) -> Self {
        Self {
            jwks_url: config.jwks_url(),
            http,
            keys: RwLock::new(KeySet::default()),
            ttl,
        }
    }

    /// Cache seeded with `keys`, fresh for the default TTL.
    pub fn with_keys(config: &ApiConfig, keys: Vec<Jwk>) -> Self {
        Self {
            keys: RwLock::new(KeySet::from_keys(keys, Instant::now())),
            ..Self::new(config)
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Key for `kid`, refetching when the cache is stale or does not know it.
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, JwksError> {
        {
            let keys = self.keys.read().await;
            if !keys.is_stale(self.ttl)
                && let Some(key) = keys.by_kid.get(kid)
            {
                return Ok(key.clone());
            }
        }

        tracing::debug!("Key '{}' not cached or cache stale, fetching JWKS", kid);
        self.refresh().await?;

        self.keys
            .read()
            .await
            .by_kid
            .get(kid)
            .cloned()
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    /// Replaces the cached keys with the tenant's current set.
    pub async fn refresh(&self) -> Result<(), JwksError> {
        tracing::trace!("Fetching JWKS from {}", self.jwks_url);
        let response = self.http.get(&self.jwks_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("JWKS endpoint answered HTTP {}", status);
            return Err(JwksError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        let document: JwksDocument = serde_json::from_slice(&body)?;
        tracing::debug!("Fetched {} keys from JWKS", document.keys.len());

        *self.keys.write().await = KeySet::from_keys(document.keys, Instant::now());
        Ok(())
    }

    pub async fn key_count(&self) -> usize {
        self.keys.read().await.by_kid.len()
    }
}
