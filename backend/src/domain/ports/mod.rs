//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Services in [`crate::domain`] depend only on these traits; the Diesel and
//! in-memory adapters under [`crate::outbound`] implement them.

mod macros;
pub(crate) use macros::define_port_error;

mod post_repository;
mod user_repository;
mod vote_ledger;

#[cfg(test)]
pub use post_repository::MockPostRepository;
pub use post_repository::{PostRepository, PostRepositoryError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};
#[cfg(test)]
pub use vote_ledger::MockVoteLedger;
pub use vote_ledger::{VoteLedger, VoteLedgerError};
