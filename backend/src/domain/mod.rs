//! Domain primitives, services and ports.
//!
//! Purpose: Define the forum's strongly typed entities and the services that
//! keep post scores consistent with the vote ledger. Persistence is reached
//! only through the traits in [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) — transport-agnostic error payload.
//! - Username, User, PasswordDigest — credential store entities.
//! - Post, PostId, PostContent — post store entities.
//! - Direction, VoteTransition, VoteChange — vote rules.
//! - Session — per-connection identity holder.
//! - Forum — facade combining the services behind a session guard.

pub mod auth;
pub mod credential_service;
pub mod error;
pub mod forum;
pub mod password;
pub mod ports;
pub mod post;
pub mod post_service;
pub mod session;
pub mod user;
pub mod vote;
pub mod vote_coordinator;

pub use self::auth::{LoginCredentials, LoginValidationError, PASSWORD_MAX_BYTES};
pub use self::credential_service::{CredentialService, RegistrationError};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::forum::Forum;
pub use self::password::{DIGEST_LEN, PasswordDigest, PasswordDigestError, SALT_LEN};
pub use self::post::{
    DEFAULT_LIST_LIMIT, INITIAL_SCORE, MAX_LIST_LIMIT, POST_CONTENT_MAX, Post, PostContent,
    PostContentError, PostId, PostIdError, clamp_list_limit,
};
pub use self::post_service::PostService;
pub use self::session::Session;
pub use self::user::{USERNAME_MAX, User, Username, UsernameValidationError};
pub use self::vote::{
    Direction, ParseDirectionError, ScoreAudit, VoteChange, VoteCommit, VoteTally, VoteTransition,
};
pub use self::vote_coordinator::{
    MAX_VOTE_ATTEMPTS, VoteApplicationError, VoteCoordinator, VoteOutcome,
};

/// Convenient result alias for facade operations.
///
/// # Examples
/// ```
/// use forum::domain::{Error, ForumResult};
///
/// fn reject() -> ForumResult<()> {
///     Err(Error::unauthorized("login required"))
/// }
/// assert!(reject().is_err());
/// ```
pub type ForumResult<T> = Result<T, Error>;
