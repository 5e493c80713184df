//! Per-connection session state.
//!
//! A [`Session`] is an explicit value owned by whoever drives one logical
//! connection (an HTTP cookie session, a CLI invocation, a test). It is passed
//! into every gated call instead of living in process-wide state, so two
//! connections can never observe each other's identity.

use super::auth::LoginCredentials;
use super::user::Username;

/// Holds at most one logged-in identity.
///
/// The raw credential is retained so each mutating request can re-verify it.
/// A failed re-verification does not clear the session; only
/// [`Session::clear`] does.
///
/// # Examples
/// ```
/// use forum::domain::{LoginCredentials, Session};
///
/// let mut session = Session::default();
/// assert!(session.current().is_none());
///
/// session.set(LoginCredentials::try_from_parts("alice", "pw1").unwrap());
/// assert_eq!(session.username().map(AsRef::as_ref), Some("alice"));
///
/// session.clear();
/// assert!(session.current().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<LoginCredentials>,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `credentials` as the current identity, replacing any previous one.
    pub fn set(&mut self, credentials: LoginCredentials) {
        self.identity = Some(credentials);
    }

    /// Forget the current identity.
    pub fn clear(&mut self) {
        self.identity = None;
    }

    /// Current identity, if any.
    pub fn current(&self) -> Option<&LoginCredentials> {
        self.identity.as_ref()
    }

    /// Username of the current identity, if any.
    pub fn username(&self) -> Option<&Username> {
        self.identity.as_ref().map(LoginCredentials::username)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn credentials(username: &str) -> LoginCredentials {
        LoginCredentials::try_from_parts(username, "pw").expect("valid credentials")
    }

    #[rstest]
    fn set_replaces_previous_identity() {
        let mut session = Session::new();
        session.set(credentials("alice"));
        session.set(credentials("bob"));
        assert_eq!(session.username().map(AsRef::as_ref), Some("bob"));
    }

    #[rstest]
    fn sessions_are_independent_values() {
        let mut first = Session::new();
        let second = Session::new();
        first.set(credentials("alice"));
        assert!(second.current().is_none());
    }

    #[rstest]
    fn debug_output_never_contains_password() {
        let mut session = Session::new();
        session.set(LoginCredentials::try_from_parts("alice", "s3cret!").expect("valid"));
        assert!(!format!("{session:?}").contains("s3cret!"));
    }
}
