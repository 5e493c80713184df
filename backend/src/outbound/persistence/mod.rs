//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories translate between Diesel rows and domain types and nothing
//! more; the score/ledger rules live in [`crate::domain`]. Connections come
//! from a `bb8` pool of `diesel-async` PostgreSQL connections.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use forum::domain::Forum;
//! use forum::outbound::persistence::{
//!     DbPool, DieselPostRepository, DieselUserRepository, DieselVoteLedger, PoolConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/forum")).await?;
//! let forum = Forum::new(
//!     Arc::new(DieselUserRepository::new(pool.clone())),
//!     Arc::new(DieselPostRepository::new(pool.clone())),
//!     Arc::new(DieselVoteLedger::new(pool)),
//! );
//! # let _ = forum;
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_post_repository;
mod diesel_user_repository;
mod diesel_vote_ledger;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_post_repository::DieselPostRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use diesel_vote_ledger::DieselVoteLedger;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
