//! Vote/score coordinator.
//!
//! Every accepted vote reaches storage as one [`VoteChange`] committed through
//! [`VoteLedger::commit`], so a post's score and its ledger move together.
//! When the voter's ledger entry changes between the read and the commit the
//! ledger reports [`VoteCommit::Stale`]; the coordinator re-plans from the
//! fresh state a bounded number of times. Storage failures are returned as-is.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::ports::{VoteLedger, VoteLedgerError};
use crate::domain::{Direction, Error, PostId, Username, VoteChange, VoteCommit, VoteTransition};

/// Commit attempts made before a vote is rejected as conflicting.
pub const MAX_VOTE_ATTEMPTS: u32 = 3;

/// Result of a vote request that was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The voter already held this vote; nothing was written.
    Unchanged {
        /// Direction already on record.
        direction: Direction,
    },
    /// Score and ledger were updated together.
    Applied {
        /// Transition that was committed.
        transition: VoteTransition,
        /// Post score after the commit.
        score: i64,
    },
}

/// Reasons a vote could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteApplicationError {
    /// The target post does not exist.
    #[error("post not found: {post_id}")]
    PostNotFound {
        /// Identifier of the missing post.
        post_id: String,
    },
    /// Concurrent requests by the same voter kept invalidating the plan.
    #[error("vote on {post_id} kept conflicting after {attempts} attempts")]
    Conflict {
        /// Identifier of the contended post.
        post_id: String,
        /// Commit attempts made.
        attempts: u32,
    },
    /// The ledger failed; nothing was written.
    #[error(transparent)]
    Storage(#[from] VoteLedgerError),
}

impl From<VoteApplicationError> for Error {
    fn from(value: VoteApplicationError) -> Self {
        match value {
            VoteApplicationError::PostNotFound { post_id } => {
                Error::not_found(format!("post {post_id} not found"))
            }
            err @ VoteApplicationError::Conflict { .. } => Error::conflict(err.to_string()),
            VoteApplicationError::Storage(err) => map_vote_ledger_error(err),
        }
    }
}

pub(crate) fn map_vote_ledger_error(error: VoteLedgerError) -> Error {
    match error {
        VoteLedgerError::Connection { message } => {
            Error::service_unavailable(format!("vote ledger unavailable: {message}"))
        }
        VoteLedgerError::Query { message } => {
            Error::internal(format!("vote ledger error: {message}"))
        }
        VoteLedgerError::MissingReference { message } => Error::not_found(message),
    }
}

/// Applies votes so that score and ledger stay consistent.
pub struct VoteCoordinator<L: ?Sized> {
    ledger: Arc<L>,
}

impl<L: ?Sized> VoteCoordinator<L> {
    /// Create a coordinator over the given ledger.
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }
}

impl<L: ?Sized> Clone for VoteCoordinator<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L> VoteCoordinator<L>
where
    L: VoteLedger + ?Sized,
{
    /// Apply `direction` from `voter` to `post_id`.
    ///
    /// A repeated vote is a no-op. A first vote moves the score by one and a
    /// switched vote by two, always in the same commit as the ledger write.
    pub async fn apply_vote(
        &self,
        voter: &Username,
        post_id: &PostId,
        direction: Direction,
    ) -> Result<VoteOutcome, VoteApplicationError> {
        let mut observed = self.ledger.get_vote(voter, post_id).await?;

        for attempt in 1..=MAX_VOTE_ATTEMPTS {
            let transition = VoteTransition::resolve(observed, direction);
            let Some(change) = VoteChange::plan(voter, post_id, observed, direction) else {
                debug!(%voter, %post_id, %direction, "vote unchanged");
                return Ok(VoteOutcome::Unchanged { direction });
            };

            match self.ledger.commit(&change).await? {
                VoteCommit::Applied { score } => {
                    info!(
                        %voter,
                        %post_id,
                        %direction,
                        delta = change.score_delta,
                        score,
                        "vote applied"
                    );
                    return Ok(VoteOutcome::Applied { transition, score });
                }
                VoteCommit::Stale { current } => {
                    warn!(%voter, %post_id, attempt, "vote ledger moved during commit");
                    observed = current;
                }
                VoteCommit::PostNotFound => {
                    return Err(VoteApplicationError::PostNotFound {
                        post_id: post_id.to_string(),
                    });
                }
            }
        }

        Err(VoteApplicationError::Conflict {
            post_id: post_id.to_string(),
            attempts: MAX_VOTE_ATTEMPTS,
        })
    }
}

#[cfg(test)]
#[path = "vote_coordinator_tests.rs"]
mod tests;
