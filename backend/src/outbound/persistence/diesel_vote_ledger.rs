//! PostgreSQL-backed `VoteLedger` adapter.
//!
//! [`VoteLedger::commit`] runs in one transaction: it locks the post row with
//! `SELECT ... FOR UPDATE`, re-reads the voter's ledger entry, and only when
//! that entry still matches the caller's plan applies the score increment and
//! the ledger upsert. Commits on the same post therefore serialise on the row
//! lock and a plan built from an outdated read is reported as stale.

use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::warn;

use crate::domain::ports::{VoteLedger, VoteLedgerError};
use crate::domain::{Direction, PostId, Username, VoteChange, VoteCommit, VoteTally};

use super::diesel_basic_error_mapping::{
    DieselFailure, classify_diesel_error, pool_error_message,
};
use super::models::{NewVoteRow, RowConversionError, decode_direction};
use super::pool::{DbPool, PoolError};
use super::schema::{posts, votes};

/// Diesel-backed vote ledger.
#[derive(Clone)]
pub struct DieselVoteLedger {
    pool: DbPool,
}

impl DieselVoteLedger {
    /// Create a ledger over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside the commit transaction; either kind rolls it back.
#[derive(Debug)]
enum CommitError {
    Diesel(diesel::result::Error),
    Row(RowConversionError),
}

impl From<diesel::result::Error> for CommitError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl From<RowConversionError> for CommitError {
    fn from(value: RowConversionError) -> Self {
        Self::Row(value)
    }
}

fn map_pool_error(error: PoolError) -> VoteLedgerError {
    VoteLedgerError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> VoteLedgerError {
    match classify_diesel_error(error, operation) {
        DieselFailure::Connection(message) => VoteLedgerError::connection(message),
        DieselFailure::ForeignKeyViolation(message) => VoteLedgerError::missing_reference(message),
        DieselFailure::UniqueViolation(message) | DieselFailure::Query(message) => {
            VoteLedgerError::query(message)
        }
    }
}

fn map_row_error(error: RowConversionError) -> VoteLedgerError {
    warn!(error = %error, "unrecognised value in votes table");
    VoteLedgerError::query(error.to_string())
}

fn map_commit_error(error: CommitError) -> VoteLedgerError {
    match error {
        CommitError::Diesel(err) => map_diesel_error(err, "commit vote"),
        CommitError::Row(err) => map_row_error(err),
    }
}

fn vote_row<'a>(voter: &'a Username, post_id: &'a PostId, direction: Direction) -> NewVoteRow<'a> {
    NewVoteRow {
        voter: voter.as_ref(),
        post_id: post_id.as_ref(),
        direction: direction.as_i16(),
        updated_at: Utc::now(),
    }
}

/// Fold `(direction, count)` groups into a tally.
fn tally_from_groups(groups: Vec<(i16, i64)>) -> Result<VoteTally, VoteLedgerError> {
    groups
        .into_iter()
        .try_fold(VoteTally::default(), |mut tally, (raw, count)| {
            let count = u64::try_from(count)
                .map_err(|_| VoteLedgerError::query("negative vote count"))?;
            match decode_direction(raw).map_err(map_row_error)? {
                Direction::Up => tally.up += count,
                Direction::Down => tally.down += count,
            }
            Ok(tally)
        })
}

#[async_trait]
impl VoteLedger for DieselVoteLedger {
    async fn get_vote(
        &self,
        voter: &Username,
        post_id: &PostId,
    ) -> Result<Option<Direction>, VoteLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let stored = votes::table
            .find((voter.as_ref(), post_id.as_ref()))
            .select(votes::direction)
            .first::<i16>(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "get vote"))?;

        stored.map(decode_direction).transpose().map_err(map_row_error)
    }

    async fn record_or_update_vote(
        &self,
        voter: &Username,
        post_id: &PostId,
        direction: Direction,
    ) -> Result<(), VoteLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(votes::table)
            .values(vote_row(voter, post_id, direction))
            .on_conflict((votes::voter, votes::post_id))
            .do_update()
            .set((
                votes::direction.eq(excluded(votes::direction)),
                votes::updated_at.eq(excluded(votes::updated_at)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_diesel_error(err, "record vote"))
    }

    async fn commit(&self, change: &VoteChange) -> Result<VoteCommit, VoteLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let post_id = change.post_id.as_ref();
        let voter = change.voter.as_ref();

        conn.transaction::<_, CommitError, _>(|conn| {
            async move {
                let locked = posts::table
                    .find(post_id)
                    .select(posts::id)
                    .for_update()
                    .get_result::<String>(conn)
                    .await
                    .optional()?;
                if locked.is_none() {
                    return Ok(VoteCommit::PostNotFound);
                }

                let current = votes::table
                    .find((voter, post_id))
                    .select(votes::direction)
                    .first::<i16>(conn)
                    .await
                    .optional()?
                    .map(decode_direction)
                    .transpose()?;
                if current != change.previous {
                    warn!(%voter, %post_id, ?current, "vote plan is stale");
                    return Ok(VoteCommit::Stale { current });
                }

                let score = diesel::update(posts::table.find(post_id))
                    .set(posts::score.eq(posts::score + change.score_delta))
                    .returning(posts::score)
                    .get_result::<i64>(conn)
                    .await?;

                diesel::insert_into(votes::table)
                    .values(vote_row(&change.voter, &change.post_id, change.next))
                    .on_conflict((votes::voter, votes::post_id))
                    .do_update()
                    .set((
                        votes::direction.eq(excluded(votes::direction)),
                        votes::updated_at.eq(excluded(votes::updated_at)),
                    ))
                    .execute(conn)
                    .await?;

                Ok(VoteCommit::Applied { score })
            }
            .scope_boxed()
        })
        .await
        .map_err(map_commit_error)
    }

    async fn tally(&self, post_id: &PostId) -> Result<VoteTally, VoteLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let groups = votes::table
            .filter(votes::post_id.eq(post_id.as_ref()))
            .group_by(votes::direction)
            .select((votes::direction, count_star()))
            .load::<(i16, i64)>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "tally votes"))?;

        tally_from_groups(groups)
    }
}
