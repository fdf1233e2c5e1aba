//! Route guard gating navigation on the authentication state.

use crate::client::auth_client::{AppState, RedirectLoginOptions};
use crate::client::auth_service::AuthService;

/// Allows navigation only for authenticated users.
///
/// Every check waits until loading has finished, so a page refresh on a
/// protected route does not bounce a logged-in user to the login page.
#[derive(Clone, Debug)]
pub struct AuthGuard {
    auth: AuthService,
}

impl AuthGuard {
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }

    /// Returns whether the route at `state_url` may be activated. When it may
    /// not, a redirect login is started that brings the user back to
    /// `state_url` afterwards.
    pub async fn can_activate(&self, state_url: &str) -> bool {
        self.redirect_if_unauthenticated(state_url).await
    }

    pub async fn can_activate_child(&self, state_url: &str) -> bool {
        self.redirect_if_unauthenticated(state_url).await
    }

    /// Returns whether a lazily loaded route may be loaded. Never starts a login.
    pub async fn can_load(&self) -> bool {
        self.auth.state().authenticated().await
    }

    async fn redirect_if_unauthenticated(&self, state_url: &str) -> bool {
        let authenticated = self.auth.state().authenticated().await;
        if authenticated {
            return true;
        }

        tracing::debug!("Route {} requires login, redirecting", state_url);
        let options = RedirectLoginOptions {
            app_state: Some(AppState::with_target(state_url)),
            ..RedirectLoginOptions::default()
        };
        if let Err(error) = self.auth.login_with_redirect(options).await {
            tracing::warn!("Could not start login for {}: {}", state_url, error);
        }
        false
    }
}
