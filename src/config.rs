//! Auth0 configuration for the SPA client integration.
//!
//! `Auth0Config` describes the tenant, the application and the options handed
//! to the wrapped authentication client. `AuthClientConfig` is the shared
//! holder every component reads it from; it can be filled at construction or
//! later, before the client is first used.

use crate::client::interceptor::HttpInterceptorConfig;
use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Where the wrapped client caches tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLocation {
    /// In-memory cache, lost on page reload
    #[default]
    Memory,
    /// Browser localStorage, survives reloads
    LocalStorage,
}

/// Parameters forwarded to the `/authorize` endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationParams {
    /// Where Auth0 redirects back to after login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Requested scopes (the client always adds `openid`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// API identifier; required to receive JWT access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

/// Auth0 configuration for the SPA client.
///
/// # Fields
///
/// - `domain`: Auth0 tenant domain (e.g., "your-tenant.auth0.com")
/// - `client_id`: Auth0 application client ID
/// - `authorization_params`: redirect URI, scope and audience
/// - `http_interceptor`: routes that get a bearer token attached (not serialized)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Auth0Config {
    pub domain: String,

    pub client_id: String,

    #[serde(default)]
    pub authorization_params: AuthorizationParams,

    /// Clock skew tolerance in seconds when validating ID token timestamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leeway: Option<u64>,

    #[serde(default)]
    pub cache_location: CacheLocation,

    /// Use refresh tokens instead of the hidden-iframe flow.
    #[serde(default)]
    pub use_refresh_tokens: bool,

    /// Fall back to the iframe flow when no refresh token is available.
    #[serde(default)]
    pub use_refresh_tokens_fallback: bool,

    /// Never handle the redirect callback automatically on startup.
    #[serde(default)]
    pub skip_redirect_callback: bool,

    /// Path to navigate to when the redirect callback fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_path: Option<String>,

    /// Keep `login_required` / `consent_required` out of the shared error channel.
    ///
    /// Callers of the token request still receive the error.
    #[serde(default)]
    pub suppress_silent_auth_errors: bool,

    #[serde(skip)]
    pub http_interceptor: Option<HttpInterceptorConfig>,
}

impl Auth0Config {
    /// Creates a configuration with only the required identifiers set.
    ///
    /// # Example
    ///
    /// ```
    /// # use rxauth0::Auth0Config;
    /// let config = Auth0Config::new("your-tenant.auth0.com", "your_client_id");
    /// assert!(config.authorization_params.audience.is_none());
    /// assert!(!config.skip_redirect_callback);
    /// ```
    pub fn new(domain: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            client_id: client_id.into(),
            authorization_params: AuthorizationParams::default(),
            leeway: None,
            cache_location: CacheLocation::default(),
            use_refresh_tokens: false,
            use_refresh_tokens_fallback: false,
            skip_redirect_callback: false,
            error_path: None,
            suppress_silent_auth_errors: false,
            http_interceptor: None,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.authorization_params.audience = Some(audience.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.authorization_params.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.authorization_params.scope = Some(scope.into());
        self
    }

    pub fn with_error_path(mut self, error_path: impl Into<String>) -> Self {
        self.error_path = Some(error_path.into());
        self
    }

    pub fn with_http_interceptor(mut self, interceptor: HttpInterceptorConfig) -> Self {
        self.http_interceptor = Some(interceptor);
        self
    }

    /// Loads the configuration from compile-time environment variables.
    ///
    /// Expected environment variables:
    /// - `AUTH0_DOMAIN` - Auth0 tenant domain
    /// - `AUTH0_CLIENT_ID` - Auth0 application client ID
    /// - `AUTH0_AUDIENCE` - Auth0 API audience (optional)
    /// - `AUTH0_REDIRECT_URI` - login callback URL (optional)
    ///
    /// Returns `None` if a required variable was not set at compile time.
    /// `build.rs` feeds these from `.env` or `.env.example`.
    pub fn from_env() -> Option<Self> {
        let domain = option_env!("AUTH0_DOMAIN")?;
        let client_id = option_env!("AUTH0_CLIENT_ID")?;

        let mut config = Self::new(domain, client_id);
        config.authorization_params.audience = option_env!("AUTH0_AUDIENCE")
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        config.authorization_params.redirect_uri = option_env!("AUTH0_REDIRECT_URI")
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Some(config)
    }

    /// Returns the base URL for Auth0 API endpoints.
    ///
    /// # Example
    ///
    /// ```
    /// # use rxauth0::Auth0Config;
    /// let config = Auth0Config::new("test.auth0.com", "client");
    /// assert_eq!(config.base_url(), "https://test.auth0.com");
    /// ```
    pub fn base_url(&self) -> String {
        format!("https://{}", self.domain)
    }

    /// Returns the token endpoint URL.
    ///
    /// The interceptor never attaches tokens to this URL.
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url())
    }

    /// Returns the issuer expected in ID tokens.
    pub fn issuer(&self) -> String {
        format!("{}/", self.base_url())
    }
}

/// Shared, possibly lazily filled, configuration holder.
///
/// Cloning shares the underlying slot. Use [`AuthClientConfig::new`] when the
/// configuration is known up front and [`AuthClientConfig::lazy`] when it
/// arrives later (e.g. fetched from a config endpoint).
#[derive(Clone, Debug, Default)]
pub struct AuthClientConfig {
    slot: Arc<RwLock<Option<Auth0Config>>>,
}

impl AuthClientConfig {
    pub fn new(config: Auth0Config) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(config))),
        }
    }

    /// Creates an empty holder; [`set`](Self::set) must run before first use.
    pub fn lazy() -> Self {
        Self::default()
    }

    /// Supplies (or replaces) the configuration.
    pub fn set(&self, config: Auth0Config) {
        tracing::trace!("Setting Auth0 configuration for domain {}", config.domain);
        match self.slot.write() {
            Ok(mut slot) => *slot = Some(config),
            Err(poisoned) => *poisoned.into_inner() = Some(config),
        }
    }

    /// Returns the configuration, or [`AuthError::ConfigurationMissing`].
    pub fn get(&self) -> Result<Auth0Config, AuthError> {
        let slot = match self.slot.read() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone().ok_or(AuthError::ConfigurationMissing)
    }

    pub fn is_set(&self) -> bool {
        self.get().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let config = Auth0Config::new("test.auth0.com", "test_client_id");

        assert_eq!(config.domain, "test.auth0.com");
        assert_eq!(config.client_id, "test_client_id");
        assert_eq!(config.cache_location, CacheLocation::Memory);
        assert!(config.error_path.is_none());
        assert!(config.http_interceptor.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let config = Auth0Config::new("test.auth0.com", "test_client_id")
            .with_audience("https://api.test.com")
            .with_redirect_uri("http://localhost:4200")
            .with_scope("openid profile email")
            .with_error_path("/error");

        assert_eq!(
            config.authorization_params.audience.as_deref(),
            Some("https://api.test.com")
        );
        assert_eq!(
            config.authorization_params.redirect_uri.as_deref(),
            Some("http://localhost:4200")
        );
        assert_eq!(
            config.authorization_params.scope.as_deref(),
            Some("openid profile email")
        );
        assert_eq!(config.error_path.as_deref(), Some("/error"));
    }

    #[test]
    fn test_urls() {
        let config = Auth0Config::new("test.auth0.com", "test_client_id");
        assert_eq!(config.base_url(), "https://test.auth0.com");
        assert_eq!(config.token_url(), "https://test.auth0.com/oauth/token");
        assert_eq!(config.issuer(), "https://test.auth0.com/");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "domain": "test.auth0.com",
            "client_id": "abc",
            "cache_location": "localstorage",
            "use_refresh_tokens": true,
            "authorization_params": { "audience": "https://api.test.com" }
        }"#;

        let config: Auth0Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.cache_location, CacheLocation::LocalStorage);
        assert!(config.use_refresh_tokens);
        assert!(!config.use_refresh_tokens_fallback);
        assert!(!config.suppress_silent_auth_errors);
        assert_eq!(
            config.authorization_params.audience.as_deref(),
            Some("https://api.test.com")
        );
        assert!(config.http_interceptor.is_none());
    }

    #[test]
    fn test_serialization_skips_empty_options() {
        let config = Auth0Config::new("test.auth0.com", "abc");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("error_path"));
        assert!(!json.contains("leeway"));
        assert!(!json.contains("http_interceptor"));
    }

    #[test]
    fn test_from_env() {
        // Only populated when AUTH0_* variables were present at compile time
        if let Some(cfg) = Auth0Config::from_env() {
            assert!(!cfg.domain.is_empty());
            assert!(!cfg.client_id.is_empty());
        }
    }

    #[test]
    fn test_lazy_config_fails_until_set() {
        let holder = AuthClientConfig::lazy();
        assert!(!holder.is_set());
        assert_eq!(holder.get().unwrap_err(), AuthError::ConfigurationMissing);

        let shared = holder.clone();
        shared.set(Auth0Config::new("late.auth0.com", "late"));

        assert!(holder.is_set());
        assert_eq!(holder.get().unwrap().domain, "late.auth0.com");
    }

    #[test]
    fn test_set_replaces_configuration() {
        let holder = AuthClientConfig::new(Auth0Config::new("a.auth0.com", "a"));
        holder.set(Auth0Config::new("b.auth0.com", "b"));
        assert_eq!(holder.get().unwrap().client_id, "b");
    }
}
