//! Who the push channel is opened for.

use std::fmt;

use pixelpals_proto::UserId;

/// The logged-in user.
///
/// `user_id` keys domain relations (senders, conversations); `username`
/// addresses the per-user push queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Server-assigned user id.
    pub user_id: UserId,
    /// Display name, also the queue addressing key.
    pub username: String,
}

impl Identity {
    /// Create an identity.
    pub fn new(user_id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), username: username.into() }
    }

    /// Both fields are known. A session never connects otherwise.
    pub fn is_complete(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.username.trim().is_empty()
    }
}

/// Bearer credential attached to the handshake and every REST call.
///
/// `Debug` is redacted so tokens do not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw bearer token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token, for building `Authorization` headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `Bearer <token>` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_incomplete() {
        assert!(Identity::new("u1", "alice").is_complete());
        assert!(!Identity::new("", "alice").is_complete());
        assert!(!Identity::new("u1", "  ").is_complete());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.bearer(), "Bearer secret-value");
    }
}
