//! Test doubles for the wrapped client and the hosting environment.

use crate::client::auth_client::{
    AuthClient, GetTokenSilentlyOptions, GetTokenWithPopupOptions, LogoutOptions,
    PopupConfigOptions, PopupLoginOptions, RedirectLoginOptions, RedirectLoginResult, TokenResult,
};
use crate::client::claims::IdTokenClaims;
use crate::client::navigator::{Location, Router};
use crate::error::AuthError;
use crate::user::User;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_stream::{Stream, StreamExt};

pub(crate) fn test_user() -> User {
    User::new("auth0|123456")
        .with_email("test@example.com")
        .with_name("Test User")
}

pub(crate) fn test_claims() -> IdTokenClaims {
    serde_json::from_value(serde_json::json!({
        "__raw": "header.payload.signature",
        "sub": "auth0|123456",
        "iss": "https://test.auth0.com/",
        "aud": "test_client_id",
    }))
    .expect("valid claims fixture")
}

/// Awaits the next stream item, giving up after a second.
pub(crate) async fn next_item<S>(stream: &mut S) -> Option<S::Item>
where
    S: Stream + Unpin,
{
    tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .ok()
        .flatten()
}

/// Returns true if the stream stays quiet for a short while.
pub(crate) async fn stays_silent<S>(stream: &mut S) -> bool
where
    S: Stream + Unpin,
{
    tokio::time::timeout(Duration::from_millis(50), stream.next())
        .await
        .is_err()
}

#[derive(Default)]
pub(crate) struct Calls {
    pub check_session: AtomicUsize,
    pub is_authenticated: AtomicUsize,
    pub get_user: AtomicUsize,
    pub get_id_token_claims: AtomicUsize,
    pub get_token_silently: AtomicUsize,
    pub get_token_with_popup: AtomicUsize,
    pub login_with_redirect: AtomicUsize,
    pub login_with_popup: AtomicUsize,
    pub logout: AtomicUsize,
    pub handle_redirect_callback: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct MockState {
    authenticated: bool,
    user: Option<User>,
    claims: Option<IdTokenClaims>,
    token: Result<TokenResult, AuthError>,
    popup_token: Result<Option<String>, AuthError>,
    callback: Result<RedirectLoginResult, AuthError>,
    check_session_error: Option<AuthError>,
    is_authenticated_error: Option<AuthError>,
    login_error: Option<AuthError>,
    logout_error: Option<AuthError>,
    last_redirect_options: Option<RedirectLoginOptions>,
    last_callback_url: Option<Option<String>>,
    last_logout: Option<LogoutOptions>,
}

/// Scriptable stand-in for the Auth0 SPA client.
pub(crate) struct MockAuthClient {
    state: Mutex<MockState>,
    pub calls: Calls,
    hold_check_session: AtomicBool,
    release_check_session: Notify,
    user_in_flight: AtomicUsize,
    max_user_in_flight: AtomicUsize,
}

impl MockAuthClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                authenticated: false,
                user: None,
                claims: None,
                token: Ok(TokenResult::Token("access_token".to_string())),
                popup_token: Ok(Some("popup_token".to_string())),
                callback: Ok(RedirectLoginResult::default()),
                check_session_error: None,
                is_authenticated_error: None,
                login_error: None,
                logout_error: None,
                last_redirect_options: None,
                last_callback_url: None,
                last_logout: None,
            }),
            calls: Calls::default(),
            hold_check_session: AtomicBool::new(false),
            release_check_session: Notify::new(),
            user_in_flight: AtomicUsize::new(0),
            max_user_in_flight: AtomicUsize::new(0),
        }
    }

    /// A client with an active session for `test_user()`.
    pub fn authenticated() -> Self {
        let mock = Self::new();
        mock.sign_in(test_user());
        mock
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().expect("mock state lock");
        f(&mut state)
    }

    pub fn sign_in(&self, user: User) {
        self.with_state(|s| {
            s.authenticated = true;
            s.user = Some(user);
            s.claims = Some(test_claims());
        });
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.with_state(|s| s.authenticated = authenticated);
    }

    pub fn set_token(&self, token: Result<TokenResult, AuthError>) {
        self.with_state(|s| s.token = token);
    }

    pub fn set_popup_token(&self, token: Result<Option<String>, AuthError>) {
        self.with_state(|s| s.popup_token = token);
    }

    pub fn set_callback(&self, result: Result<RedirectLoginResult, AuthError>) {
        self.with_state(|s| s.callback = result);
    }

    pub fn set_check_session_error(&self, error: Option<AuthError>) {
        self.with_state(|s| s.check_session_error = error);
    }

    pub fn set_is_authenticated_error(&self, error: Option<AuthError>) {
        self.with_state(|s| s.is_authenticated_error = error);
    }

    pub fn set_login_error(&self, error: Option<AuthError>) {
        self.with_state(|s| s.login_error = error);
    }

    pub fn set_logout_error(&self, error: Option<AuthError>) {
        self.with_state(|s| s.logout_error = error);
    }

    pub fn last_redirect_options(&self) -> Option<RedirectLoginOptions> {
        self.with_state(|s| s.last_redirect_options.clone())
    }

    pub fn last_callback_url(&self) -> Option<Option<String>> {
        self.with_state(|s| s.last_callback_url.clone())
    }

    pub fn last_logout(&self) -> Option<LogoutOptions> {
        self.with_state(|s| s.last_logout.clone())
    }

    /// Makes `check_session` block until [`release_check_session`](Self::release_check_session).
    pub fn hold_check_session(&self) {
        self.hold_check_session.store(true, Ordering::SeqCst);
    }

    pub fn release_check_session(&self) {
        self.hold_check_session.store(false, Ordering::SeqCst);
        self.release_check_session.notify_one();
    }

    pub fn max_concurrent_user_fetches(&self) -> usize {
        self.max_user_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthClient for MockAuthClient {
    async fn check_session(&self) -> Result<(), AuthError> {
        self.calls.check_session.fetch_add(1, Ordering::SeqCst);
        if self.hold_check_session.load(Ordering::SeqCst) {
            self.release_check_session.notified().await;
        }
        match self.with_state(|s| s.check_session_error.clone()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn is_authenticated(&self) -> Result<bool, AuthError> {
        self.calls.is_authenticated.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| match &s.is_authenticated_error {
            Some(error) => Err(error.clone()),
            None => Ok(s.authenticated),
        })
    }

    async fn get_user(&self) -> Result<Option<User>, AuthError> {
        self.calls.get_user.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.user_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_user_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        // Leave room for another fetch to interleave if the caller allowed it
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        self.user_in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.with_state(|s| s.user.clone()))
    }

    async fn get_id_token_claims(&self) -> Result<Option<IdTokenClaims>, AuthError> {
        self.calls.get_id_token_claims.fetch_add(1, Ordering::SeqCst);
        Ok(self.with_state(|s| s.claims.clone()))
    }

    async fn get_token_silently(
        &self,
        _options: GetTokenSilentlyOptions,
    ) -> Result<TokenResult, AuthError> {
        self.calls.get_token_silently.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| s.token.clone())
    }

    async fn get_token_with_popup(
        &self,
        _options: GetTokenWithPopupOptions,
        _config: PopupConfigOptions,
    ) -> Result<Option<String>, AuthError> {
        self.calls.get_token_with_popup.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| s.popup_token.clone())
    }

    async fn login_with_redirect(&self, options: RedirectLoginOptions) -> Result<(), AuthError> {
        self.calls.login_with_redirect.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| {
            s.last_redirect_options = Some(options);
            s.login_error.clone().map_or(Ok(()), Err)
        })
    }

    async fn login_with_popup(
        &self,
        _options: PopupLoginOptions,
        _config: PopupConfigOptions,
    ) -> Result<(), AuthError> {
        self.calls.login_with_popup.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.with_state(|s| s.login_error.clone()) {
            return Err(error);
        }
        self.sign_in(test_user());
        Ok(())
    }

    async fn logout(&self, options: LogoutOptions) -> Result<(), AuthError> {
        self.calls.logout.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| {
            s.last_logout = Some(options);
            if let Some(error) = s.logout_error.clone() {
                return Err(error);
            }
            s.authenticated = false;
            s.user = None;
            s.claims = None;
            Ok(())
        })
    }

    async fn handle_redirect_callback(
        &self,
        url: Option<String>,
    ) -> Result<RedirectLoginResult, AuthError> {
        self.calls.handle_redirect_callback.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| {
            s.last_callback_url = Some(url);
            if s.callback.is_ok() {
                s.authenticated = true;
                s.user = Some(test_user());
                s.claims = Some(test_claims());
            }
            s.callback.clone()
        })
    }
}

/// Location with a fixed query string that records history replacements.
pub(crate) struct MockLocation {
    search: String,
    replaced: Mutex<Vec<String>>,
}

impl MockLocation {
    pub fn new(search: &str) -> Self {
        Self {
            search: search.to_string(),
            replaced: Mutex::new(Vec::new()),
        }
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().expect("location lock").clone()
    }
}

impl Location for MockLocation {
    fn search(&self) -> String {
        self.search.clone()
    }

    fn replace_state(&self, url: &str) {
        self.replaced
            .lock()
            .expect("location lock")
            .push(url.to_string());
    }
}

#[derive(Default)]
pub(crate) struct MockRouter {
    navigated: Mutex<Vec<String>>,
}

impl MockRouter {
    pub fn navigated(&self) -> Vec<String> {
        self.navigated.lock().expect("router lock").clone()
    }
}

#[async_trait]
impl Router for MockRouter {
    async fn navigate_by_url(&self, url: &str) -> Result<(), AuthError> {
        self.navigated
            .lock()
            .expect("router lock")
            .push(url.to_string());
        Ok(())
    }
}
