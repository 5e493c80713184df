//! Credential store service: registration and credential verification.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{Error, LoginCredentials, LoginValidationError, PasswordDigest, User};

/// Reasons a registration can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Username or password was empty or exceeded storage limits.
    #[error("invalid registration input: {0}")]
    InvalidInput(#[from] LoginValidationError),
    /// The username is already taken.
    #[error("username already registered: {username}")]
    DuplicateUsername {
        /// The rejected username.
        username: String,
    },
    /// The credential store failed.
    #[error(transparent)]
    Storage(UserPersistenceError),
}

impl From<UserPersistenceError> for RegistrationError {
    fn from(value: UserPersistenceError) -> Self {
        match value {
            UserPersistenceError::DuplicateUsername { username } => {
                Self::DuplicateUsername { username }
            }
            other => Self::Storage(other),
        }
    }
}

impl From<RegistrationError> for Error {
    fn from(value: RegistrationError) -> Self {
        match value {
            RegistrationError::InvalidInput(err) => Error::invalid_request(err.to_string()),
            RegistrationError::DuplicateUsername { username } => {
                Error::conflict(format!("username already registered: {username}"))
            }
            RegistrationError::Storage(err) => map_user_persistence_error(err),
        }
    }
}

/// Map credential store failures onto transport-agnostic errors.
pub(crate) fn map_user_persistence_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => Error::service_unavailable(message),
        UserPersistenceError::Query { message } => Error::internal(message),
        UserPersistenceError::DuplicateUsername { username } => {
            Error::conflict(format!("username already registered: {username}"))
        }
    }
}

/// Registers accounts and verifies login attempts against stored digests.
pub struct CredentialService<R: ?Sized> {
    users: Arc<R>,
}

impl<R: ?Sized> CredentialService<R> {
    /// Create a service backed by the given user repository.
    pub fn new(users: Arc<R>) -> Self {
        Self { users }
    }
}

impl<R: ?Sized> Clone for CredentialService<R> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
        }
    }
}

impl<R> CredentialService<R>
where
    R: UserRepository + ?Sized,
{
    /// Register `username` with a freshly salted digest of `raw_password`.
    pub async fn register(
        &self,
        username: &str,
        raw_password: &str,
    ) -> Result<(), RegistrationError> {
        let credentials = LoginCredentials::try_from_parts(username, raw_password)?;
        let digest = PasswordDigest::generate(credentials.password());
        let user = User::new(credentials.username().clone(), digest);

        self.users.insert(&user).await?;
        info!(username = %user.username(), "user registered");
        Ok(())
    }

    /// Check a login attempt.
    ///
    /// Returns `Ok(false)` for malformed input, unknown usernames, and wrong
    /// passwords; only storage failures produce an error.
    pub async fn verify(
        &self,
        username: &str,
        raw_password: &str,
    ) -> Result<bool, UserPersistenceError> {
        match LoginCredentials::try_from_parts(username, raw_password) {
            Ok(credentials) => self.verify_credentials(&credentials).await,
            Err(reason) => {
                debug!(%reason, "rejecting malformed credentials");
                Ok(false)
            }
        }
    }

    /// Check already validated credentials.
    pub async fn verify_credentials(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<bool, UserPersistenceError> {
        let Some(user) = self.users.find_by_username(credentials.username()).await? else {
            debug!(username = %credentials.username(), "unknown username");
            return Ok(false);
        };
        Ok(user.password().matches(credentials.password()))
    }
}
