//! Error type shared by the authentication client, the reactive state and the
//! request interceptor.
//!
//! Errors are `Clone` so the error channel can replay the most recent one to
//! late subscribers.

/// Auth0 error code returned when the user must log in interactively.
pub const LOGIN_REQUIRED: &str = "login_required";

/// Auth0 error code returned when the user must grant consent interactively.
pub const CONSENT_REQUIRED: &str = "consent_required";

/// Errors surfaced by authentication operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AuthError {
    /// Error reported by Auth0 or the wrapped client, carrying the OAuth `error` code.
    #[error("{error}: {}", .description.as_deref().unwrap_or("no description"))]
    Auth0 {
        /// OAuth error code (e.g. `login_required`)
        error: String,
        /// Human readable description, when the server supplied one
        description: Option<String>,
    },

    /// No configuration was supplied before the client was first used.
    #[error(
        "Auth0 configuration has not been set. Supply it at construction or call \
         AuthClientConfig::set before the client is first used"
    )]
    ConfigurationMissing,

    /// The hosting environment failed to navigate.
    #[error("Navigation to '{url}' failed: {reason}")]
    Navigation {
        /// Target URL
        url: String,
        /// Failure reason reported by the router
        reason: String,
    },

    /// Any other failure raised by the wrapped client (network, popup, storage).
    #[error("Authentication client error: {0}")]
    Client(String),
}

impl AuthError {
    /// Creates an Auth0 error from an OAuth error code and optional description.
    ///
    /// # Example
    ///
    /// ```
    /// # use rxauth0::AuthError;
    /// let err = AuthError::auth0("login_required", Some("Login required"));
    /// assert_eq!(err.code(), Some("login_required"));
    /// ```
    pub fn auth0(error: impl Into<String>, description: Option<&str>) -> Self {
        Self::Auth0 {
            error: error.into(),
            description: description.map(str::to_string),
        }
    }

    /// Returns the OAuth error code, when there is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AuthError::Auth0 { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns true for the codes a silent token request yields when the user
    /// has to interact (`login_required`, `consent_required`).
    pub fn is_silent_auth_failure(&self) -> bool {
        matches!(self.code(), Some(LOGIN_REQUIRED | CONSENT_REQUIRED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_only_for_auth0_errors() {
        assert_eq!(
            AuthError::auth0("invalid_grant", None).code(),
            Some("invalid_grant")
        );
        assert_eq!(AuthError::ConfigurationMissing.code(), None);
        assert_eq!(AuthError::Client("offline".to_string()).code(), None);
    }

    #[test]
    fn test_silent_auth_failures() {
        assert!(AuthError::auth0(LOGIN_REQUIRED, None).is_silent_auth_failure());
        assert!(AuthError::auth0(CONSENT_REQUIRED, None).is_silent_auth_failure());
        assert!(!AuthError::auth0("access_denied", None).is_silent_auth_failure());
        assert!(!AuthError::ConfigurationMissing.is_silent_auth_failure());
    }

    #[test]
    fn test_display() {
        let err = AuthError::auth0("access_denied", Some("User cancelled"));
        assert_eq!(err.to_string(), "access_denied: User cancelled");

        let err = AuthError::auth0("access_denied", None);
        assert_eq!(err.to_string(), "access_denied: no description");
    }
}
