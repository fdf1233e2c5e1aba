//! Contract of the wrapped Auth0 SPA client and the shared handle to it.
//!
//! Token storage, refresh, PKCE and the popup/redirect mechanics all live
//! behind [`AuthClient`]. This crate only orchestrates it, so every method is
//! an async suspension point that may fail with an [`AuthError`].

use crate::client::claims::IdTokenClaims;
use crate::config::{Auth0Config, AuthClientConfig, AuthorizationParams};
use crate::error::AuthError;
use crate::user::User;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Caller-supplied payload round-tripped through the redirect login flow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Path to navigate to once the redirect callback has been handled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppState {
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            extra: Map::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RedirectLoginOptions {
    pub app_state: Option<AppState>,
    pub authorization_params: AuthorizationParams,
    /// Fragment appended to the `/authorize` URL
    pub fragment: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PopupLoginOptions {
    pub authorization_params: AuthorizationParams,
}

#[derive(Clone, Debug, Default)]
pub struct PopupConfigOptions {
    /// Seconds to wait for the popup to complete (client default: 60)
    pub timeout_in_seconds: Option<u64>,
}

/// Whether a silent token request may be answered from the client's cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    On,
    Off,
    CacheOnly,
}

#[derive(Clone, Debug, Default)]
pub struct GetTokenSilentlyOptions {
    pub cache_mode: CacheMode,
    pub authorization_params: AuthorizationParams,
    pub timeout_in_seconds: Option<u64>,
    /// Return the full token endpoint response instead of the access token alone
    pub detailed_response: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GetTokenWithPopupOptions {
    pub cache_mode: CacheMode,
    pub authorization_params: AuthorizationParams,
}

/// Full token endpoint response, returned for `detailed_response` requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenEndpointResponse {
    pub access_token: String,
    pub id_token: String,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Result of a silent token request.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenResult {
    Token(String),
    Detailed(TokenEndpointResponse),
}

impl TokenResult {
    pub fn access_token(&self) -> &str {
        match self {
            TokenResult::Token(token) => token,
            TokenResult::Detailed(response) => &response.access_token,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogoutParams {
    /// Where Auth0 sends the browser after logging out
    pub return_to: Option<String>,
    /// Also log out of the upstream identity provider
    pub federated: bool,
}

/// How the client leaves the page when logging out.
#[derive(Clone, Default)]
pub enum OpenUrl {
    /// Navigate the browser to Auth0's logout endpoint
    #[default]
    Redirect,
    /// Only clear the local session; no navigation
    Suppress,
    /// Hand the logout URL to the application
    Custom(Arc<dyn Fn(&str) + Send + Sync>),
}

impl fmt::Debug for OpenUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenUrl::Redirect => f.write_str("Redirect"),
            OpenUrl::Suppress => f.write_str("Suppress"),
            OpenUrl::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogoutOptions {
    pub logout_params: LogoutParams,
    pub open_url: OpenUrl,
}

impl LogoutOptions {
    /// Logout that clears the local session without leaving the page.
    pub fn local_only() -> Self {
        Self {
            open_url: OpenUrl::Suppress,
            ..Self::default()
        }
    }

    /// True when the client will not navigate the browser itself, so nothing
    /// else tells the application that the session ended.
    pub fn skips_browser_redirect(&self) -> bool {
        !matches!(self.open_url, OpenUrl::Redirect)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RedirectLoginResult {
    pub app_state: Option<AppState>,
}

/// Operations the wrapped Auth0 SPA client provides.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Restores a session silently if one exists; failures mean "not logged in".
    async fn check_session(&self) -> Result<(), AuthError>;

    async fn is_authenticated(&self) -> Result<bool, AuthError>;

    async fn get_user(&self) -> Result<Option<User>, AuthError>;

    async fn get_id_token_claims(&self) -> Result<Option<IdTokenClaims>, AuthError>;

    async fn get_token_silently(
        &self,
        options: GetTokenSilentlyOptions,
    ) -> Result<TokenResult, AuthError>;

    async fn get_token_with_popup(
        &self,
        options: GetTokenWithPopupOptions,
        config: PopupConfigOptions,
    ) -> Result<Option<String>, AuthError>;

    async fn login_with_redirect(&self, options: RedirectLoginOptions) -> Result<(), AuthError>;

    async fn login_with_popup(
        &self,
        options: PopupLoginOptions,
        config: PopupConfigOptions,
    ) -> Result<(), AuthError>;

    async fn logout(&self, options: LogoutOptions) -> Result<(), AuthError>;

    /// Exchanges the authorization result in `url` (or the current location).
    async fn handle_redirect_callback(
        &self,
        url: Option<String>,
    ) -> Result<RedirectLoginResult, AuthError>;
}

type ClientFactory = dyn Fn(&Auth0Config) -> Arc<dyn AuthClient> + Send + Sync;

/// Handle to the single client instance of the application.
///
/// The client is built from the configuration the first time it is needed and
/// never rebuilt; all clones share it.
#[derive(Clone)]
pub struct SharedAuthClient {
    config: AuthClientConfig,
    factory: Option<Arc<ClientFactory>>,
    instance: Arc<OnceLock<Arc<dyn AuthClient>>>,
}

impl SharedAuthClient {
    /// Creates a handle that builds the client with `factory` on first use.
    pub fn new<F>(config: AuthClientConfig, factory: F) -> Self
    where
        F: Fn(&Auth0Config) -> Arc<dyn AuthClient> + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Some(Arc::new(factory)),
            instance: Arc::new(OnceLock::new()),
        }
    }

    /// Wraps a client that has already been constructed.
    pub fn from_client(config: AuthClientConfig, client: Arc<dyn AuthClient>) -> Self {
        let instance = OnceLock::new();
        let _ = instance.set(client);
        Self {
            config,
            factory: None,
            instance: Arc::new(instance),
        }
    }

    pub fn config(&self) -> &AuthClientConfig {
        &self.config
    }

    /// Returns the client, building it on first call.
    ///
    /// Fails with [`AuthError::ConfigurationMissing`] if it still has to be
    /// built and no configuration has been supplied yet.
    pub fn get(&self) -> Result<Arc<dyn AuthClient>, AuthError> {
        if let Some(client) = self.instance.get() {
            return Ok(Arc::clone(client));
        }

        let config = self.config.get()?;
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| AuthError::Client("no client factory registered".to_string()))?;

        let client = self.instance.get_or_init(|| {
            tracing::debug!("Constructing Auth0 client for domain {}", config.domain);
            factory(&config)
        });
        Ok(Arc::clone(client))
    }
}

impl fmt::Debug for SharedAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedAuthClient")
            .field("config", &self.config)
            .field("constructed", &self.instance.get().is_some())
            .finish()
    }
}
