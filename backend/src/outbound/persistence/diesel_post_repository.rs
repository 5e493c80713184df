//! PostgreSQL-backed `PostRepository` adapter.
//!
//! Score changes are single `UPDATE` statements, so concurrent writers never
//! read-modify-write the column from application code.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{PostRepository, PostRepositoryError};
use crate::domain::{Post, PostId};

use super::diesel_basic_error_mapping::{
    DieselFailure, classify_diesel_error, pool_error_message,
};
use super::models::{NewPostRow, PostRow, RowConversionError};
use super::pool::{DbPool, PoolError};
use super::schema::posts;

/// Diesel-backed post store.
#[derive(Clone)]
pub struct DieselPostRepository {
    pool: DbPool,
}

impl DieselPostRepository {
    /// Create a repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> PostRepositoryError {
    PostRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> PostRepositoryError {
    match classify_diesel_error(error, operation) {
        DieselFailure::Connection(message) => PostRepositoryError::connection(message),
        DieselFailure::UniqueViolation(message)
        | DieselFailure::ForeignKeyViolation(message)
        | DieselFailure::Query(message) => PostRepositoryError::query(message),
    }
}

fn map_row_error(error: RowConversionError) -> PostRepositoryError {
    warn!(error = %error, "stored post row is invalid");
    PostRepositoryError::query(error.to_string())
}

fn limit_to_i64(limit: usize) -> Result<i64, PostRepositoryError> {
    i64::try_from(limit).map_err(|_| PostRepositoryError::query("list limit out of range"))
}

#[async_trait]
impl PostRepository for DieselPostRepository {
    async fn insert(&self, post: &Post) -> Result<(), PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(posts::table)
            .values(NewPostRow::from(post))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_diesel_error(err, "insert post"))
    }

    async fn find_by_id(&self, id: &PostId) -> Result<Option<Post>, PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = posts::table
            .find(id.as_ref())
            .select(PostRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find post"))?;

        row.map(Post::try_from).transpose().map_err(map_row_error)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Post>, PostRepositoryError> {
        let limit = limit_to_i64(limit)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows = posts::table
            .order((posts::created_at.desc(), posts::id.desc()))
            .limit(limit)
            .select(PostRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list posts"))?;

        rows.into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()
            .map_err(map_row_error)
    }

    async fn set_score(&self, id: &PostId, score: i64) -> Result<(), PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(posts::table.find(id.as_ref()))
            .set(posts::score.eq(score))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "set score"))?;

        if updated == 0 {
            return Err(PostRepositoryError::not_found(id.as_ref()));
        }
        Ok(())
    }

    async fn increment_score(&self, id: &PostId, delta: i64) -> Result<i64, PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(posts::table.find(id.as_ref()))
            .set(posts::score.eq(posts::score + delta))
            .returning(posts::score)
            .get_result::<i64>(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "increment score"))?
            .ok_or_else(|| PostRepositoryError::not_found(id.as_ref()))
    }
}
