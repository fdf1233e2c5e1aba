//! Dioxus hooks exposing the authentication state to components.
//!
//! [`use_auth_provider`] is called once at the root of the application with
//! the [`AuthService`]; it mirrors the service's streams into a signal so
//! components re-render when the state changes. Descendants read it through
//! [`use_auth`].

use crate::client::auth_client::{LogoutOptions, RedirectLoginOptions};
use crate::client::auth_service::AuthService;
use crate::client::claims::IdTokenClaims;
use crate::error::AuthError;
use crate::user::User;
use dioxus::prelude::*;
use tokio_stream::{Stream, StreamExt};

/// Snapshot of the authentication state held in the context signal.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthView {
    /// Whether the initial session check is still running
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub id_token_claims: Option<IdTokenClaims>,
    /// Most recent authentication error
    pub error: Option<AuthError>,
}

impl Default for AuthView {
    fn default() -> Self {
        Self {
            is_loading: true,
            is_authenticated: false,
            user: None,
            id_token_claims: None,
            error: None,
        }
    }
}

/// Provides authentication context to the component tree.
///
/// Must be called once, at the root of the application.
///
/// # Example
///
/// ```ignore
/// #[component]
/// pub fn App() -> Element {
///     let auth = use_hook(|| AuthService::new(client, location, None));
///     use_auth_provider(auth);
///     // ... rest of app
/// }
/// ```
pub fn use_auth_provider(service: AuthService) -> AuthContext {
    let view = use_signal(AuthView::default);
    let service = use_context_provider(move || service);

    use_hook({
        let service = service.clone();
        move || {
            mirror(service.is_loading(), view, |view, loading| view.is_loading = loading);
            mirror(service.is_authenticated(), view, |view, authenticated| {
                view.is_authenticated = authenticated
            });
            mirror(service.user(), view, |view, user| view.user = user);
            mirror(service.id_token_claims(), view, |view, claims| {
                view.id_token_claims = claims
            });
            mirror(service.error(), view, |view, error| view.error = Some(error));
        }
    });

    let login = {
        let service = service.clone();
        Callback::new(move |options: RedirectLoginOptions| {
            let service = service.clone();
            spawn(async move {
                tracing::trace!("Login requested from UI");
                if let Err(error) = service.login_with_redirect(options).await {
                    tracing::error!("Login failed: {}", error);
                }
            });
        })
    };

    let logout = Callback::new(move |options: LogoutOptions| {
        let service = service.clone();
        spawn(async move {
            tracing::trace!("Logout requested from UI");
            if let Err(error) = service.logout(options).await {
                tracing::error!("Logout failed: {}", error);
            }
        });
    });

    use_context_provider(|| AuthContext {
        view,
        login,
        logout,
    })
}

/// Returns the context installed by [`use_auth_provider`].
///
/// # Panics
///
/// Panics if no ancestor component called `use_auth_provider()`.
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>()
}

/// Returns the service installed by [`use_auth_provider`], for operations the
/// context does not wrap (tokens, popups, guards).
pub fn use_auth_service() -> AuthService {
    use_context::<AuthService>()
}

fn mirror<T, S>(stream: S, mut view: Signal<AuthView>, apply: fn(&mut AuthView, T))
where
    S: Stream<Item = T> + 'static,
    T: 'static,
{
    spawn(async move {
        let mut stream = Box::pin(stream);
        while let Some(value) = stream.next().await {
            apply(&mut view.write(), value);
        }
    });
}

#[derive(Clone, Copy)]
pub struct AuthContext {
    view: Signal<AuthView>,
    pub login: Callback<RedirectLoginOptions>,
    pub logout: Callback<LogoutOptions>,
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        self.view.read().is_authenticated
    }

    /// Returns true while the initial session check is running.
    pub fn is_loading(&self) -> bool {
        self.view.read().is_loading
    }

    pub fn user(&self) -> Option<User> {
        self.view.read().user.clone()
    }

    pub fn id_token_claims(&self) -> Option<IdTokenClaims> {
        self.view.read().id_token_claims.clone()
    }

    pub fn error(&self) -> Option<AuthError> {
        self.view.read().error.clone()
    }

    pub fn has_error(&self) -> bool {
        self.view.read().error.is_some()
    }

    pub fn view(&self) -> AuthView {
        self.view.read().clone()
    }

    pub fn login_with_redirect(&self, options: RedirectLoginOptions) {
        self.login.call(options);
    }

    /// Starts the redirect login with the configured defaults.
    pub fn login_default(&self) {
        self.login.call(RedirectLoginOptions::default());
    }

    pub fn logout_with(&self, options: LogoutOptions) {
        self.logout.call(options);
    }

    /// Logs out through Auth0's logout endpoint.
    pub fn logout_default(&self) {
        self.logout.call(LogoutOptions::default());
    }
}
