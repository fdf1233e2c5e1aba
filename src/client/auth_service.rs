//! Application-facing authentication facade.
//!
//! [`AuthService`] wraps the shared client, drives the reactive
//! [`AuthState`] and handles the startup sequence: when the page was loaded as
//! the redirect target of a login, the authorization result is exchanged and
//! the user is sent on to the page they originally asked for; otherwise an
//! existing session is restored silently.

use crate::client::auth_client::{
    AppState, AuthClient, GetTokenSilentlyOptions, GetTokenWithPopupOptions, LogoutOptions,
    PopupConfigOptions, PopupLoginOptions, RedirectLoginOptions, RedirectLoginResult,
    SharedAuthClient, TokenResult,
};
use crate::client::auth_state::AuthState;
use crate::client::claims::IdTokenClaims;
use crate::client::error_channel::ErrorChannel;
use crate::client::navigator::{Location, Navigator, Router, is_authorization_result};
use crate::config::AuthClientConfig;
use crate::error::AuthError;
use crate::user::User;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt, wrappers::WatchStream};

/// Authentication facade. Cloning is cheap and shares all state.
///
/// Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<Inner>,
}

struct Inner {
    client: SharedAuthClient,
    state: AuthState,
    location: Arc<dyn Location>,
    navigator: Navigator,
    app_state: watch::Sender<Option<AppState>>,
    startup: Mutex<Option<JoinHandle<()>>>,
}

impl AuthService {
    /// Creates the service and starts the session check in the background.
    ///
    /// Navigation after the redirect callback goes through `router` when one is
    /// given and replaces the history entry otherwise.
    pub fn new(
        client: SharedAuthClient,
        location: Arc<dyn Location>,
        router: Option<Arc<dyn Router>>,
    ) -> Self {
        let state = AuthState::new(client.clone(), ErrorChannel::new());
        let navigator = Navigator::new(router, Arc::clone(&location));
        let (app_state, _) = watch::channel(None);

        let inner = Arc::new(Inner {
            client,
            state,
            location,
            navigator,
            app_state,
            startup: Mutex::new(None),
        });

        let task = tokio::spawn(Inner::start(Arc::clone(&inner)));
        match inner.startup.lock() {
            Ok(mut startup) => *startup = Some(task),
            Err(poisoned) => *poisoned.into_inner() = Some(task),
        }

        Self { inner }
    }

    pub fn config(&self) -> &AuthClientConfig {
        self.inner.client.config()
    }

    pub fn client(&self) -> &SharedAuthClient {
        &self.inner.client
    }

    pub fn state(&self) -> &AuthState {
        &self.inner.state
    }

    pub fn is_loading(&self) -> impl Stream<Item = bool> + Send + 'static {
        self.inner.state.is_loading()
    }

    pub fn is_authenticated(&self) -> impl Stream<Item = bool> + Send + 'static {
        self.inner.state.is_authenticated()
    }

    pub fn user(&self) -> impl Stream<Item = Option<User>> + Send + 'static {
        self.inner.state.user()
    }

    pub fn id_token_claims(&self) -> impl Stream<Item = Option<IdTokenClaims>> + Send + 'static {
        self.inner.state.id_token_claims()
    }

    pub fn error(&self) -> impl Stream<Item = AuthError> + Send + 'static {
        self.inner.state.error()
    }

    /// App state returned by the most recent redirect callback, replayed to new
    /// subscribers.
    pub fn app_state(&self) -> impl Stream<Item = AppState> + Send + 'static {
        WatchStream::new(self.inner.app_state.subscribe()).filter_map(|state| state)
    }

    pub async fn wait_until_loaded(&self) {
        self.inner.state.wait_until_loaded().await;
    }

    /// Starts the redirect login flow. The browser leaves the page on success.
    pub async fn login_with_redirect(&self, options: RedirectLoginOptions) -> Result<(), AuthError> {
        let client = self.inner.resolve_client()?;
        tracing::debug!("Starting redirect login");
        client
            .login_with_redirect(options)
            .await
            .map_err(|error| self.inner.fail("login_with_redirect", error))
    }

    /// Logs in through a popup and refreshes the state once it completes.
    pub async fn login_with_popup(
        &self,
        options: PopupLoginOptions,
        config: PopupConfigOptions,
    ) -> Result<(), AuthError> {
        let client = self.inner.resolve_client()?;
        tracing::debug!("Starting popup login");
        client
            .login_with_popup(options, config)
            .await
            .map_err(|error| self.inner.fail("login_with_popup", error))?;

        self.inner.state.refresh();
        Ok(())
    }

    /// Logs out. When the client does not navigate the browser away the state
    /// is refreshed so subscribers see the session end.
    pub async fn logout(&self, options: LogoutOptions) -> Result<(), AuthError> {
        let client = self.inner.resolve_client()?;
        let refresh = options.skips_browser_redirect();
        tracing::debug!("Logging out (local only: {})", refresh);

        client
            .logout(options)
            .await
            .map_err(|error| self.inner.fail("logout", error))?;

        if refresh {
            self.inner.state.refresh();
        }
        Ok(())
    }

    /// Fetches an access token without user interaction.
    ///
    /// A new token is fed into the state. On failure the error is recorded,
    /// the state is refreshed and the error is returned.
    pub async fn get_access_token_silently(
        &self,
        options: GetTokenSilentlyOptions,
    ) -> Result<TokenResult, AuthError> {
        let client = self.inner.resolve_client()?;
        match client.get_token_silently(options).await {
            Ok(result) => {
                self.inner.state.set_access_token(result.access_token());
                Ok(result)
            }
            Err(error) => {
                let error = self.inner.fail("get_access_token_silently", error);
                self.inner.state.refresh();
                Err(error)
            }
        }
    }

    /// Fetches an access token through a popup. The token is returned to the
    /// caller only and does not trigger a state recomputation.
    pub async fn get_access_token_with_popup(
        &self,
        options: GetTokenWithPopupOptions,
        config: PopupConfigOptions,
    ) -> Result<Option<String>, AuthError> {
        let client = self.inner.resolve_client()?;
        client
            .get_token_with_popup(options, config)
            .await
            .map_err(|error| self.inner.fail("get_access_token_with_popup", error))
    }

    /// Exchanges the authorization result in `url` (or the current location)
    /// and navigates to the app state's target, `/` when there is none.
    ///
    /// On failure the error is recorded, the browser is sent to the configured
    /// error path (or `/`) and the error is returned.
    pub async fn handle_redirect_callback(
        &self,
        url: Option<String>,
    ) -> Result<RedirectLoginResult, AuthError> {
        self.inner.handle_redirect_callback(url).await
    }

    /// Stops startup and the state derivation. Streams stop changing.
    pub fn dispose(&self) {
        self.inner.abort_startup();
        self.inner.state.dispose();
    }
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("client", &self.inner.client)
            .field("navigator", &self.inner.navigator)
            .field("is_loading", &self.inner.state.is_loading_now())
            .finish()
    }
}

impl Inner {
    async fn start(self: Arc<Self>) {
        let config = match self.client.config().get() {
            Ok(config) => config,
            Err(error) => {
                tracing::error!("Cannot start authentication: {}", error);
                self.state.set_error(error);
                self.state.set_is_loading(false);
                return;
            }
        };
        self.state
            .errors()
            .set_suppress_silent_auth_errors(config.suppress_silent_auth_errors);

        let search = self.location.search();
        if !config.skip_redirect_callback && is_authorization_result(&search) {
            tracing::debug!("Authorization result found in location, handling callback");
            // Failures are recorded and navigated away from inside
            let _ = self.handle_redirect_callback(None).await;
        } else {
            tracing::trace!("Checking for an existing session");
            let checked = match self.resolve_client() {
                Ok(client) => client.check_session().await,
                Err(error) => Err(error),
            };
            if let Err(error) = checked {
                self.fail("check_session", error);
                self.navigate(config.error_path.as_deref().unwrap_or("/"))
                    .await;
            }
        }

        self.state.set_is_loading(false);
    }

    async fn handle_redirect_callback(
        &self,
        url: Option<String>,
    ) -> Result<RedirectLoginResult, AuthError> {
        let result = match self.resolve_client() {
            Ok(client) => client.handle_redirect_callback(url).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(result) => {
                if !self.state.is_loading_now() {
                    self.state.refresh();
                }

                let target = result
                    .app_state
                    .as_ref()
                    .and_then(|state| state.target.clone())
                    .unwrap_or_else(|| "/".to_string());
                if let Some(app_state) = &result.app_state {
                    self.app_state.send_replace(Some(app_state.clone()));
                }

                tracing::debug!("Redirect callback handled, navigating to {}", target);
                self.navigate(&target).await;
                Ok(result)
            }
            Err(error) => {
                let error = self.fail("handle_redirect_callback", error);
                let error_path = self
                    .client
                    .config()
                    .get()
                    .ok()
                    .and_then(|config| config.error_path);
                self.navigate(error_path.as_deref().unwrap_or("/")).await;
                Err(error)
            }
        }
    }

    fn resolve_client(&self) -> Result<Arc<dyn AuthClient>, AuthError> {
        self.client
            .get()
            .map_err(|error| self.fail("resolving client", error))
    }

    async fn navigate(&self, url: &str) {
        if let Err(error) = self.navigator.navigate_by_url(url).await {
            self.fail("navigation", error);
        }
    }

    /// Logs and records `error`, handing it back for propagation.
    fn fail(&self, operation: &str, error: AuthError) -> AuthError {
        tracing::error!("{} failed: {}", operation, error);
        self.state.set_error(error.clone());
        error
    }

    fn abort_startup(&self) {
        let task = match self.startup.lock() {
            Ok(mut startup) => startup.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            task.abort();
        }
    }
}
