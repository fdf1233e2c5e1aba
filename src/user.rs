//! User profile returned by the authentication client.
//!
//! The profile mirrors the OpenID Connect standard claims the wrapped client
//! exposes through `get_user`. Claims this struct does not name are kept in
//! `extra` so custom namespaced claims survive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile of the authenticated user.
///
/// Only `sub` is guaranteed; every other field depends on the scopes that were
/// requested at login.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Subject identifier, e.g. `auth0|<user_id>` or `<provider>|<user_id>`.
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    /// URL of the profile picture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// ISO 8601 timestamp of the last profile update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Claims not covered by the fields above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Creates a profile carrying only the subject.
    ///
    /// # Example
    ///
    /// ```
    /// # use rxauth0::User;
    /// let user = User::new("auth0|123456");
    /// assert_eq!(user.sub, "auth0|123456");
    /// assert!(user.email.is_none());
    /// ```
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    /// Returns a name suitable for display.
    ///
    /// Prefers `name`, then `nickname`, then `email`, and finally `sub`.
    ///
    /// # Example
    ///
    /// ```
    /// # use rxauth0::User;
    /// let user = User::new("auth0|123456").with_email("user@example.com");
    /// assert_eq!(user.display_name(), "user@example.com");
    /// ```
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.nickname.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }

    /// Returns up to two upper-case initials for avatar placeholders.
    ///
    /// Uses the first letters of the first two words of `name`, otherwise the
    /// first two characters of the display name.
    pub fn initials(&self) -> String {
        let words: Vec<&str> = self
            .name
            .as_deref()
            .map(|n| n.split_whitespace().collect())
            .unwrap_or_default();

        match words.as_slice() {
            [first, second, ..] => first
                .chars()
                .take(1)
                .chain(second.chars().take(1))
                .collect::<String>()
                .to_uppercase(),
            _ => self
                .display_name()
                .chars()
                .take(2)
                .collect::<String>()
                .to_uppercase(),
        }
    }

    /// Looks up a claim that has no dedicated field (e.g. a namespaced role claim).
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
