//! Outbound adapters implementing the domain ports.
//!
//! - **persistence**: PostgreSQL repositories built on Diesel
//! - **memory**: mutex-guarded in-process store for tests and embedding

pub mod memory;
pub mod persistence;
