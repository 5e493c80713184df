//! Internal Diesel row structs and their conversion into domain types.
//!
//! Rows are never exposed outside the persistence layer. Stored values are
//! re-validated on the way out so a hand-edited row cannot produce an invalid
//! domain value.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{
    Direction, PasswordDigest, PasswordDigestError, Post, PostContent, PostContentError, PostId,
    PostIdError, User, Username, UsernameValidationError,
};

use super::schema::{posts, users, votes};

/// Failures while turning a stored row into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum RowConversionError {
    #[error("stored username is invalid: {0}")]
    Username(#[from] UsernameValidationError),
    #[error("stored password digest is invalid: {0}")]
    Password(#[from] PasswordDigestError),
    #[error("stored post id is invalid: {0}")]
    PostId(#[from] PostIdError),
    #[error("stored post content is invalid: {0}")]
    Content(#[from] PostContentError),
    #[error("stored vote direction {0} is neither 1 nor -1")]
    Direction(i16),
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub username: String,
    pub password_salt: Vec<u8>,
    pub password_digest: Vec<u8>,
}

impl TryFrom<UserRow> for User {
    type Error = RowConversionError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::new(&row.username)?;
        let password = PasswordDigest::from_stored(&row.password_salt, &row.password_digest)?;
        Ok(User::new(username, password))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub username: &'a str,
    pub password_salt: &'a [u8],
    pub password_digest: &'a [u8],
}

impl<'a> From<&'a User> for NewUserRow<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            username: user.username().as_ref(),
            password_salt: user.password().salt(),
            password_digest: user.password().digest(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PostRow {
    pub id: String,
    pub author: String,
    pub content: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = RowConversionError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Post {
            id: PostId::new(&row.id)?,
            author: Username::new(&row.author)?,
            content: PostContent::new(&row.content)?,
            score: row.score,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub(crate) struct NewPostRow<'a> {
    pub id: &'a str,
    pub author: &'a str,
    pub content: &'a str,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Post> for NewPostRow<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            id: post.id.as_ref(),
            author: post.author.as_ref(),
            content: post.content.as_ref(),
            score: post.score,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = votes)]
pub(crate) struct NewVoteRow<'a> {
    pub voter: &'a str,
    pub post_id: &'a str,
    pub direction: i16,
    pub updated_at: DateTime<Utc>,
}

/// Decode a stored direction column.
pub(crate) fn decode_direction(raw: i16) -> Result<Direction, RowConversionError> {
    Direction::from_i16(raw).ok_or(RowConversionError::Direction(raw))
}
