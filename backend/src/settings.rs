//! Forum configuration loaded via OrthoConfig.
//!
//! Values come from `FORUM_*` environment variables, configuration files and
//! command-line arguments, in OrthoConfig's usual precedence.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{DEFAULT_LIST_LIMIT, clamp_list_limit};
use crate::outbound::persistence::PoolConfig;

/// Environment variable consulted when `FORUM_DATABASE_URL` is unset.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Runtime settings for the forum.
///
/// The defaults below must agree with [`PoolConfig::DEFAULT_MAX_SIZE`] and
/// [`DEFAULT_LIST_LIMIT`].
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FORUM")]
pub struct ForumSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    #[ortho_config(default = 10)]
    pub pool_max_size: u32,
    /// Number of posts listed when no limit is given.
    #[ortho_config(default = 25)]
    pub list_limit: usize,
}

impl Default for ForumSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            pool_max_size: PoolConfig::DEFAULT_MAX_SIZE,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ForumSettings {
    /// Configured database URL, falling back to `DATABASE_URL`.
    pub fn database_url(&self) -> Option<String> {
        self.database_url
            .clone()
            .or_else(|| std::env::var(DATABASE_URL_ENV).ok())
            .filter(|url| !url.trim().is_empty())
    }

    /// Replace the configured database URL, e.g. from a command-line flag.
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = Some(database_url.into());
        self
    }

    /// Default list limit, clamped to the supported maximum.
    pub fn list_limit(&self) -> usize {
        clamp_list_limit(self.list_limit)
    }
}
