//! Access token validation for the demo API.
//!
//! Checks the signature against the tenant's JWKS, plus issuer, audience and
//! expiry.

use crate::server::ApiConfig;
use crate::server::claims::AccessTokenClaims;
use crate::server::jwks::{JwksCache, JwksError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode, decode_header};

/// Error types for token validation operations.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// JWT header is missing the kid (key ID) field
    #[error("JWT header missing 'kid' field")]
    MissingKid,

    /// Failed to decode JWT header
    #[error("Failed to decode JWT header: {0}")]
    HeaderDecodeError(#[from] jsonwebtoken::errors::Error),

    /// Failed to fetch or use JWKS key
    #[error("JWKS error: {0}")]
    JwksError(#[from] JwksError),

    #[error("Token validation failed: {0}")]
    ValidationFailed(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid audience claim")]
    InvalidAudience,

    #[error("Invalid issuer claim")]
    InvalidIssuer,
}

/// Validates an access token and returns its claims.
///
/// # Errors
///
/// Returns `ValidationError` if the header cannot be decoded or has no `kid`,
/// no JWKS key matches, the signature is invalid, or the `aud`, `iss` or `exp`
/// claims do not check out.
///
/// # Example
///
/// ```rust,ignore
/// let config = ApiConfig::new("tenant.auth0.com", "https://api.example.com");
/// let jwks = JwksCache::new(&config);
/// let claims = validate_access_token(&token, &config, &jwks).await?;
/// tracing::info!("Token for {}", claims.sub);
/// ```
pub async fn validate_access_token(
    token: &str,
    config: &ApiConfig,
    jwks_cache: &JwksCache,
) -> Result<AccessTokenClaims, ValidationError> {
    let header = decode_header(token)?;
    tracing::trace!("Decoded JWT header: alg={:?}", header.alg);

    let kid = header.kid.ok_or(ValidationError::MissingKid)?;
    let jwk = jwks_cache.get_key(&kid).await?;

    let algorithm = jwk.algorithm()?;
    let decoding_key = jwk.to_decoding_key()?;

    let mut validation = Validation::new(algorithm);
    validation.set_audience(&[&config.audience]);
    validation.set_issuer(&[config.issuer()]);
    validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

    let token_data =
        decode::<AccessTokenClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::warn!("Token validation failed: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => ValidationError::TokenExpired,
                ErrorKind::InvalidAudience => ValidationError::InvalidAudience,
                ErrorKind::InvalidIssuer => ValidationError::InvalidIssuer,
                _ => ValidationError::ValidationFailed(e.to_string()),
            }
        })?;

    tracing::trace!("Validated access token for: {}", token_data.claims.sub);
    Ok(token_data.claims)
}

#[cfg(test)]
pub(crate) mod test_keys {
    use crate::client::claims::Audience;
    use crate::server::ApiConfig;
    use crate::server::claims::AccessTokenClaims;
    use crate::server::jwks::{Jwk, JwksCache};
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

    pub const KID: &str = "test-key";

    pub fn config() -> ApiConfig {
        ApiConfig::new("test.auth0.com", "https://api.test.com")
    }

    pub fn jwks() -> JwksCache {
        let key = Jwk {
            kty: "RSA".to_string(),
            kid: KID.to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some(include_str!("testdata/rsa_modulus.txt").trim().to_string()),
            e: Some("AQAB".to_string()),
        };
        JwksCache::with_keys(&config(), vec![key])
    }

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    pub fn claims(config: &ApiConfig) -> AccessTokenClaims {
        let now = now();
        AccessTokenClaims {
            sub: "auth0|test123".to_string(),
            iss: config.issuer(),
            aud: Audience::Multiple(vec![
                config.audience.clone(),
                "https://test.auth0.com/userinfo".to_string(),
            ]),
            iat: now,
            exp: now + 3600,
            azp: Some("test_client_id".to_string()),
            scope: Some("openid profile".to_string()),
            permissions: Vec::new(),
        }
    }

    pub fn expired_claims(config: &ApiConfig) -> AccessTokenClaims {
        let now = now();
        AccessTokenClaims {
            iat: now - 7200,
            exp: now - 3600,
            ..claims(config)
        }
    }

    pub fn sign(claims: &AccessTokenClaims) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KID.to_string());
        let key = EncodingKey::from_rsa_pem(include_bytes!("testdata/rsa_private.pem")).unwrap();
        encode(&header, claims, &key).unwrap()
    }
}
