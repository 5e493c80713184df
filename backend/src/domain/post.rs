//! Post data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::Username;

/// Score every post starts with.
pub const INITIAL_SCORE: i64 = 1;
/// Maximum allowed post length, in characters.
pub const POST_CONTENT_MAX: usize = 10_000;
/// Number of posts returned when the caller does not ask for a limit.
pub const DEFAULT_LIST_LIMIT: usize = 25;
/// Upper bound applied to any requested list limit.
pub const MAX_LIST_LIMIT: usize = 100;

const POST_ID_BYTES: usize = 16;

/// Validation errors for [`PostId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostIdError {
    /// The identifier was not `2 * 16` hex characters.
    #[error("post id must be {expected} hex characters")]
    InvalidLength {
        /// Required length.
        expected: usize,
    },
    /// The identifier contained characters outside `[0-9a-f]`.
    #[error("post id must be lowercase hexadecimal")]
    InvalidCharacters,
}

/// Opaque post identifier: a 128-bit random token rendered as lowercase hex.
///
/// # Examples
/// ```
/// use forum::domain::PostId;
///
/// let id = PostId::random();
/// assert_eq!(id.as_ref().len(), 32);
/// assert_eq!(id.as_ref().parse::<PostId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostId(String);

impl PostId {
    /// Generate a fresh identifier.
    pub fn random() -> Self {
        let bytes: [u8; POST_ID_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Validate and construct an identifier from its hex rendering.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PostIdError> {
        let raw = raw.as_ref();
        if raw.len() != POST_ID_BYTES * 2 {
            return Err(PostIdError::InvalidLength {
                expected: POST_ID_BYTES * 2,
            });
        }
        if !raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(PostIdError::InvalidCharacters);
        }
        Ok(Self(raw.to_owned()))
    }
}

impl AsRef<str> for PostId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for PostId {
    type Err = PostIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<PostId> for String {
    fn from(value: PostId) -> Self {
        value.0
    }
}

impl TryFrom<String> for PostId {
    type Error = PostIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Validation errors for [`PostContent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostContentError {
    /// The content was blank.
    #[error("post content must not be empty")]
    Empty,
    /// The content exceeded [`POST_CONTENT_MAX`] characters.
    #[error("post content must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Post body text, stored untruncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostContent(String);

impl PostContent {
    /// Validate and construct post content, trimming surrounding whitespace.
    pub fn new(content: impl AsRef<str>) -> Result<Self, PostContentError> {
        let trimmed = content.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PostContentError::Empty);
        }
        if trimmed.chars().count() > POST_CONTENT_MAX {
            return Err(PostContentError::TooLong {
                max: POST_CONTENT_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for PostContent {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<PostContent> for String {
    fn from(value: PostContent) -> Self {
        value.0
    }
}

impl TryFrom<String> for PostContent {
    type Error = PostContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Forum post.
///
/// ## Invariants
/// - `score` starts at [`INITIAL_SCORE`] and only changes through the vote
///   coordinator (or an explicit administrative overwrite).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Stable identifier.
    pub id: PostId,
    /// Account that submitted the post.
    pub author: Username,
    /// Body text.
    pub content: PostContent,
    /// Current score.
    pub score: i64,
    /// Submission time, used for most-recent-first listing.
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Draft a new post with a fresh identifier and the initial score.
    pub fn draft(author: Username, content: PostContent, created_at: DateTime<Utc>) -> Self {
        Self {
            id: PostId::random(),
            author,
            content,
            score: INITIAL_SCORE,
            created_at,
        }
    }
}

/// Clamp a caller-provided list limit to [`MAX_LIST_LIMIT`].
pub fn clamp_list_limit(limit: usize) -> usize {
    limit.min(MAX_LIST_LIMIT)
}
