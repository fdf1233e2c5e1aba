//! Client-side authentication: the reactive state, the facade around the
//! wrapped Auth0 client, route guarding and request interception.
//!
//! - [`auth_client`] - contract of the wrapped client and the shared handle
//! - [`auth_state`] - reactive state derived from the client
//! - [`auth_service`] - login, logout, tokens and the redirect callback
//! - [`guard`] - route guard
//! - [`interceptor`] - `tower` layer attaching bearer tokens
//! - [`use_auth`] - Dioxus hooks (`client` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use rxauth0::client::{AuthService, SharedAuthClient};
//! use rxauth0::config::AuthClientConfig;
//!
//! let config = AuthClientConfig::new(Auth0Config::from_env().unwrap());
//! let client = SharedAuthClient::new(config, |config| Arc::new(SpaClient::new(config)));
//! let auth = AuthService::new(client, Arc::new(BrowserLocation), None);
//!
//! let mut authenticated = Box::pin(auth.is_authenticated());
//! while let Some(authenticated) = authenticated.next().await {
//!     tracing::info!("Authenticated: {}", authenticated);
//! }
//! ```

pub mod auth_client;
pub mod auth_service;
pub mod auth_state;
pub mod claims;
pub mod error_channel;
pub mod guard;
pub mod interceptor;
pub mod navigator;
#[cfg(feature = "client")]
pub mod use_auth;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use auth_client::{
    AppState, AuthClient, CacheMode, GetTokenSilentlyOptions, GetTokenWithPopupOptions,
    LogoutOptions, LogoutParams, OpenUrl, PopupConfigOptions, PopupLoginOptions,
    RedirectLoginOptions, RedirectLoginResult, SharedAuthClient, TokenEndpointResponse,
    TokenResult,
};
pub use auth_service::AuthService;
pub use auth_state::{AuthSnapshot, AuthState};
pub use claims::{Audience, IdTokenClaims};
pub use error_channel::ErrorChannel;
pub use guard::AuthGuard;
pub use interceptor::{
    ApiRouteDefinition, AuthHttpLayer, AuthHttpService, HttpInterceptorConfig,
    HttpInterceptorRouteConfig,
};
pub use navigator::{Location, Navigator, Router, is_authorization_result};
#[cfg(feature = "client")]
pub use use_auth::{AuthContext, AuthView, use_auth, use_auth_provider, use_auth_service};
