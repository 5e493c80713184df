//! Port abstraction for post persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{Post, PostId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by post repository adapters.
    pub enum PostRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "post repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "post repository query failed: {message}",
        /// The addressed post does not exist.
        NotFound { post_id: String } => "post not found: {post_id}",
    }
}

/// Post store port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Persist a freshly drafted post.
    async fn insert(&self, post: &Post) -> Result<(), PostRepositoryError>;

    /// Fetch a post by identifier.
    async fn find_by_id(&self, id: &PostId) -> Result<Option<Post>, PostRepositoryError>;

    /// List at most `limit` posts, most recent first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Post>, PostRepositoryError>;

    /// Overwrite a post's score unconditionally.
    ///
    /// Must be a single atomic write. Fails with
    /// [`PostRepositoryError::NotFound`] when the post is missing.
    async fn set_score(&self, id: &PostId, score: i64) -> Result<(), PostRepositoryError>;

    /// Atomically add `delta` to a post's score and return the new value.
    async fn increment_score(&self, id: &PostId, delta: i64) -> Result<i64, PostRepositoryError>;
}
