//! Browser location access and post-callback navigation.
//!
//! After the redirect callback the application must leave the callback URL.
//! When a router is available it navigates through it, otherwise the history
//! entry is replaced in place.

use crate::error::AuthError;
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Minimal view of the browser location.
pub trait Location: Send + Sync {
    /// Query string of the current URL, with or without the leading `?`.
    fn search(&self) -> String;

    /// Replaces the current history entry with `url` without reloading.
    fn replace_state(&self, url: &str);
}

/// Application router capable of in-app navigation.
#[async_trait]
pub trait Router: Send + Sync {
    async fn navigate_by_url(&self, url: &str) -> Result<(), AuthError>;
}

/// Navigation capability selected at construction.
#[derive(Clone)]
pub enum Navigator {
    Router(Arc<dyn Router>),
    NoRouter(Arc<dyn Location>),
}

impl Navigator {
    /// Uses the router when one is supplied, the raw history API otherwise.
    pub fn new(router: Option<Arc<dyn Router>>, location: Arc<dyn Location>) -> Self {
        match router {
            Some(router) => Navigator::Router(router),
            None => Navigator::NoRouter(location),
        }
    }

    pub async fn navigate_by_url(&self, url: &str) -> Result<(), AuthError> {
        match self {
            Navigator::Router(router) => {
                tracing::trace!("Navigating to {} via router", url);
                router.navigate_by_url(url).await
            }
            Navigator::NoRouter(location) => {
                tracing::trace!("Replacing history state with {}", url);
                location.replace_state(url);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Navigator::Router(_) => f.write_str("Navigator::Router"),
            Navigator::NoRouter(_) => f.write_str("Navigator::NoRouter"),
        }
    }
}

/// Returns true if `search` carries an authorization result: a `state`
/// parameter together with `code` or `error`.
///
/// Parameter names must match exactly; `xyzcode=1` is not `code=1`.
///
/// # Example
///
/// ```
/// # use rxauth0::client::navigator::is_authorization_result;
/// assert!(is_authorization_result("?code=123&state=456"));
/// assert!(!is_authorization_result("?xyzcode=123&abcstate=456"));
/// ```
pub fn is_authorization_result(search: &str) -> bool {
    let mut has_code = false;
    let mut has_error = false;
    let mut has_state = false;

    for pair in search.trim_start_matches('?').split('&') {
        let name = pair.split_once('=').map_or(pair, |(name, _)| name);
        let name = urlencoding::decode(name).unwrap_or(Cow::Borrowed(name));
        match name.as_ref() {
            "code" => has_code = true,
            "error" => has_error = true,
            "state" => has_state = true,
            _ => {}
        }
    }

    has_state && (has_code || has_error)
}
