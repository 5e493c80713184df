//! Forum backend: credential verification, session gating, posts, and a
//! vote ledger kept consistent with post scores.

pub mod domain;
pub mod outbound;
pub mod settings;
