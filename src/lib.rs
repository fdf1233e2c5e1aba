//! # rxauth0
//!
//! Reactive Auth0 integration: observable authentication state, a login/logout
//! facade, route guarding and a bearer-token HTTP layer over an Auth0 SPA
//! client.
//!
//! ## Overview
//!
//! The Auth0 client itself (token storage, refresh, PKCE, popups and
//! redirects) stays behind the [`client::AuthClient`] trait. This crate
//! republishes what it knows as streams and awaitable operations:
//!
//! - **Shared types** (`Auth0Config`, `User`, `AuthError`) - available in all contexts
//! - **Client-side** - `AuthState`, `AuthService`, `AuthGuard`, `AuthHttpLayer`
//!   and, with the `client` feature, Dioxus hooks
//! - **Server-side** - a demo API validating the tokens the client sends (native-only)
//!
//! ## Features
//!
//! ### `client` (default)
//!
//! Dioxus hooks (`use_auth_provider`, `use_auth`) mirroring the authentication
//! state into signals.
//!
//! **Dependencies**: `dioxus`
//!
//! ### `server` (Native-only)
//!
//! `axum` router with `GET /api/external`, JWKS caching and access token
//! validation.
//!
//! **Dependencies**: `axum`, `jsonwebtoken`, `reqwest`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rxauth0::{Auth0Config, AuthService};
//! use rxauth0::client::{AuthGuard, SharedAuthClient};
//! use rxauth0::config::AuthClientConfig;
//!
//! let config = AuthClientConfig::new(
//!     Auth0Config::new("tenant.auth0.com", "client_id").with_audience("https://api.example.com"),
//! );
//! let client = SharedAuthClient::new(config, |config| Arc::new(SpaClient::new(config)));
//! let auth = AuthService::new(client, Arc::new(BrowserLocation), Some(router));
//!
//! // Route guard
//! let guard = AuthGuard::new(auth.clone());
//! if guard.can_activate("/profile").await {
//!     // render the page
//! }
//!
//! // Tokens for API calls
//! let token = auth.get_access_token_silently(Default::default()).await?;
//! ```
//!
//! ## Runtime
//!
//! `AuthState` and `AuthService` spawn their background work on the ambient
//! Tokio runtime and must be created inside one.

pub mod config;
pub mod error;
pub mod user;

pub mod client;

#[cfg(all(feature = "server", not(target_arch = "wasm32")))]
pub mod server;

pub use client::{AuthGuard, AuthService, AuthState};
pub use config::{Auth0Config, AuthClientConfig};
pub use error::AuthError;
pub use user::User;
