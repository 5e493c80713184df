//! User data model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::password::PasswordDigest;

/// Maximum allowed length for a username, in characters.
pub const USERNAME_MAX: usize = 64;

/// Validation errors returned by [`Username::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsernameValidationError {
    /// Username was missing or blank once trimmed.
    #[error("username must not be empty")]
    Empty,
    /// Username exceeded the storage limit.
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Unique account key.
///
/// ## Invariants
/// - Trimmed and non-empty.
/// - At most [`USERNAME_MAX`] characters.
///
/// # Examples
/// ```
/// use forum::domain::Username;
///
/// let name = Username::new("  alice ").unwrap();
/// assert_eq!(name.as_ref(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`], trimming surrounding whitespace.
    pub fn new(username: impl AsRef<str>) -> Result<Self, UsernameValidationError> {
        let normalized = username.as_ref().trim();
        if normalized.is_empty() {
            return Err(UsernameValidationError::Empty);
        }
        if normalized.chars().count() > USERNAME_MAX {
            return Err(UsernameValidationError::TooLong { max: USERNAME_MAX });
        }
        Ok(Self(normalized.to_owned()))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Registered forum account.
///
/// Created on registration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    username: Username,
    password: PasswordDigest,
}

impl User {
    /// Build a user from a validated username and a computed digest.
    pub fn new(username: Username, password: PasswordDigest) -> Self {
        Self { username, password }
    }

    /// Account key.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Salted password digest.
    pub fn password(&self) -> &PasswordDigest {
        &self.password
    }
}
