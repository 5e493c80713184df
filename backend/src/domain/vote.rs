//! Vote directions and the transition rules that keep score and ledger
//! consistent.
//!
//! The coordinator never writes a score without a matching ledger change:
//! [`VoteTransition::resolve`] decides both at once from the voter's previous
//! vote and the requested direction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::post::{INITIAL_SCORE, PostId};
use super::user::Username;

/// A voter's stance on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Upvote, worth `+1`.
    Up,
    /// Downvote, worth `-1`.
    Down,
}

impl Direction {
    /// Score contribution of a single vote in this direction.
    pub fn weight(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// The other direction.
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Signed representation used by persistence adapters.
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// Decode the signed storage representation.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Error returned when parsing an unknown direction label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("vote direction must be `up` or `down`, got `{0}`")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(ParseDirectionError(s.to_owned())),
        }
    }
}

/// What a vote request does to the score and the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// The voter already holds the requested vote; nothing changes.
    Unchanged,
    /// First vote on the post: apply a single-weight delta and insert.
    Cast {
        /// Score delta, `+1` or `-1`.
        delta: i64,
    },
    /// Opposite vote already recorded: reverse it and apply the new one.
    Switched {
        /// Score delta, `+2` or `-2`.
        delta: i64,
    },
}

impl VoteTransition {
    /// Decide the transition for `requested` given the voter's `existing` vote.
    ///
    /// # Examples
    /// ```
    /// use forum::domain::{Direction, VoteTransition};
    ///
    /// assert_eq!(
    ///     VoteTransition::resolve(Some(Direction::Up), Direction::Down),
    ///     VoteTransition::Switched { delta: -2 }
    /// );
    /// ```
    pub fn resolve(existing: Option<Direction>, requested: Direction) -> Self {
        match existing {
            None => Self::Cast {
                delta: requested.weight(),
            },
            Some(current) if current == requested => Self::Unchanged,
            Some(current) => Self::Switched {
                delta: requested.weight() - current.weight(),
            },
        }
    }

    /// Score delta this transition applies.
    pub fn delta(self) -> i64 {
        match self {
            Self::Unchanged => 0,
            Self::Cast { delta } | Self::Switched { delta } => delta,
        }
    }
}

/// Compare-and-swap request handed to the vote ledger.
///
/// The ledger applies `score_delta` and stores `next` only if the voter's
/// stored vote still equals `previous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteChange {
    /// Account casting the vote.
    pub voter: Username,
    /// Target post.
    pub post_id: PostId,
    /// Vote the caller observed before deciding the transition.
    pub previous: Option<Direction>,
    /// Vote to record.
    pub next: Direction,
    /// Score delta to apply atomically with the ledger write.
    pub score_delta: i64,
}

impl VoteChange {
    /// Build the change for a non-trivial transition.
    ///
    /// Returns `None` for [`VoteTransition::Unchanged`], which must not reach
    /// storage.
    pub fn plan(
        voter: &Username,
        post_id: &PostId,
        previous: Option<Direction>,
        requested: Direction,
    ) -> Option<Self> {
        match VoteTransition::resolve(previous, requested) {
            VoteTransition::Unchanged => None,
            transition => Some(Self {
                voter: voter.clone(),
                post_id: post_id.clone(),
                previous,
                next: requested,
                score_delta: transition.delta(),
            }),
        }
    }
}

/// Result of a ledger commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteCommit {
    /// Score and ledger were updated together; carries the new score.
    Applied {
        /// Score after the delta was applied.
        score: i64,
    },
    /// The stored vote no longer matched `previous`; nothing was written.
    Stale {
        /// Vote currently stored for the voter.
        current: Option<Direction>,
    },
    /// The post does not exist; nothing was written.
    PostNotFound,
}

/// Vote counts for one post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    /// Number of upvotes.
    pub up: u64,
    /// Number of downvotes.
    pub down: u64,
}

impl VoteTally {
    /// Score implied by the ledger: the initial score plus net votes.
    pub fn expected_score(self) -> i64 {
        let up = i64::try_from(self.up).unwrap_or(i64::MAX);
        let down = i64::try_from(self.down).unwrap_or(i64::MAX);
        INITIAL_SCORE.saturating_add(up).saturating_sub(down)
    }
}

/// Comparison of a post's stored score with the score implied by its votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreAudit {
    /// Score stored on the post.
    pub stored: i64,
    /// Score derived from the ledger tally.
    pub expected: i64,
}

impl ScoreAudit {
    /// Whether the stored score matches the ledger.
    pub fn is_consistent(self) -> bool {
        self.stored == self.expected
    }
}
