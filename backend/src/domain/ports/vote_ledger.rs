//! Port abstraction for the vote ledger.
//!
//! The ledger owns one record per `(voter, post)` pair. Besides plain lookup
//! and upsert it exposes [`VoteLedger::commit`], the unit of work the vote
//! coordinator relies on to change a post's score and the voter's ledger
//! entry together.

use async_trait::async_trait;

use crate::domain::{Direction, PostId, Username, VoteChange, VoteCommit, VoteTally};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by vote ledger adapters.
    pub enum VoteLedgerError {
        /// Repository connection could not be established.
        Connection { message: String } => "vote ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "vote ledger query failed: {message}",
        /// The referenced post or voter does not exist.
        MissingReference { message: String } => "vote references missing record: {message}",
    }
}

/// Vote ledger port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Return the voter's recorded direction for a post, if any.
    async fn get_vote(
        &self,
        voter: &Username,
        post_id: &PostId,
    ) -> Result<Option<Direction>, VoteLedgerError>;

    /// Insert the vote, or overwrite the direction if one is already stored.
    ///
    /// Idempotent for repeated calls with the same direction. Does not touch
    /// the post's score.
    async fn record_or_update_vote(
        &self,
        voter: &Username,
        post_id: &PostId,
        direction: Direction,
    ) -> Result<(), VoteLedgerError>;

    /// Apply a planned vote change as one transaction.
    ///
    /// Implementations must:
    /// - serialise concurrent commits on the same post,
    /// - return [`VoteCommit::Stale`] without writing when the stored vote
    ///   differs from `change.previous`,
    /// - otherwise add `change.score_delta` to the post's score and store
    ///   `change.next`, both or neither.
    async fn commit(&self, change: &VoteChange) -> Result<VoteCommit, VoteLedgerError>;

    /// Count the up and down votes recorded for a post.
    async fn tally(&self, post_id: &PostId) -> Result<VoteTally, VoteLedgerError>;
}
