//! Post store service: submission, lookup, listing and score overwrite.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::ports::{PostRepository, PostRepositoryError};
use crate::domain::{Error, Post, PostContent, PostId, Username, clamp_list_limit};

/// Map post store failures onto transport-agnostic errors.
pub(crate) fn map_post_repository_error(error: PostRepositoryError) -> Error {
    match error {
        PostRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("post store unavailable: {message}"))
        }
        PostRepositoryError::Query { message } => {
            Error::internal(format!("post store error: {message}"))
        }
        PostRepositoryError::NotFound { post_id } => {
            Error::not_found(format!("post {post_id} not found"))
        }
    }
}

/// Creates and reads posts.
pub struct PostService<R: ?Sized> {
    posts: Arc<R>,
}

impl<R: ?Sized> PostService<R> {
    /// Create a service backed by the given post repository.
    pub fn new(posts: Arc<R>) -> Self {
        Self { posts }
    }
}

impl<R: ?Sized> Clone for PostService<R> {
    fn clone(&self) -> Self {
        Self {
            posts: Arc::clone(&self.posts),
        }
    }
}

impl<R> PostService<R>
where
    R: PostRepository + ?Sized,
{
    /// Persist a new post with the initial score and return its identifier.
    pub async fn create(
        &self,
        author: &Username,
        content: PostContent,
    ) -> Result<PostId, PostRepositoryError> {
        let post = Post::draft(author.clone(), content, Utc::now());
        self.posts.insert(&post).await?;
        info!(post_id = %post.id, author = %post.author, "post created");
        Ok(post.id)
    }

    /// Fetch a post by identifier.
    pub async fn get(&self, post_id: &PostId) -> Result<Option<Post>, PostRepositoryError> {
        self.posts.find_by_id(post_id).await
    }

    /// List the most recent posts, clamping `limit` to the supported maximum.
    pub async fn list(&self, limit: usize) -> Result<Vec<Post>, PostRepositoryError> {
        let limit = clamp_list_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.posts.list_recent(limit).await
    }

    /// Overwrite a post's score.
    ///
    /// This bypasses the vote ledger; it exists for administrative
    /// correction after an audit and is not used by vote handling.
    pub async fn set_score(&self, post_id: &PostId, score: i64) -> Result<(), PostRepositoryError> {
        self.posts.set_score(post_id, score).await?;
        info!(%post_id, score, "post score overwritten");
        Ok(())
    }

    /// Atomically add `delta` to a post's score and return the new score.
    ///
    /// Leaves the vote ledger alone; votes go through the coordinator.
    pub async fn increment_score(
        &self,
        post_id: &PostId,
        delta: i64,
    ) -> Result<i64, PostRepositoryError> {
        self.posts.increment_score(post_id, delta).await
    }
}
