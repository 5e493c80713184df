//! Embedded PostgreSQL helpers shared by the Diesel adapter suites.
//!
//! Each suite gets a fresh temporary database on the process-wide cluster,
//! migrated with the crate's own embedded migrations. Setup failures panic
//! unless `SKIP_TEST_CLUSTER` is truthy, in which case the test is skipped.

use forum::domain::ports::{PostRepository, UserRepository};
use forum::domain::{PasswordDigest, Post, PostContent, User, Username};
use forum::outbound::persistence::{
    DbPool, DieselPostRepository, DieselUserRepository, DieselVoteLedger, PoolConfig,
    run_pending_migrations,
};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use pg_embedded_setup_unpriv::test_support::shared_cluster_handle;
use tokio::runtime::Runtime;

/// Returns true when `SKIP_TEST_CLUSTER` is "1", "true" or "yes".
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip when `SKIP_TEST_CLUSTER` allows it, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// A migrated temporary database with a pool and the runtime that owns it.
///
/// Field order matters: the pool drops before the database is removed.
pub struct TestDatabase {
    pub runtime: Runtime,
    pub pool: DbPool,
    _database: TemporaryDatabase,
}

impl TestDatabase {
    pub fn users(&self) -> DieselUserRepository {
        DieselUserRepository::new(self.pool.clone())
    }

    pub fn posts(&self) -> DieselPostRepository {
        DieselPostRepository::new(self.pool.clone())
    }

    pub fn ledger(&self) -> DieselVoteLedger {
        DieselVoteLedger::new(self.pool.clone())
    }

    /// Insert an account with password `pw`.
    pub fn seed_user(&self, name: &str) -> Username {
        let username = Username::new(name).expect("valid name");
        let user = User::new(username.clone(), PasswordDigest::generate("pw"));
        self.runtime
            .block_on(UserRepository::insert(&self.users(), &user))
            .expect("seed user");
        username
    }

    /// Insert a post by `author` and return it as drafted.
    pub fn seed_post(&self, author: &Username) -> Post {
        let post = Post::draft(
            author.clone(),
            PostContent::new("hello").expect("valid content"),
            chrono::Utc::now(),
        );
        self.runtime
            .block_on(PostRepository::insert(&self.posts(), &post))
            .expect("seed post");
        post
    }
}

/// Provision a migrated database, or `None` when the cluster is skipped.
pub fn test_database() -> Option<TestDatabase> {
    match provision() {
        Ok(database) => Some(database),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn provision() -> Result<TestDatabase, String> {
    ensure_stable_password();
    let cluster = shared_cluster_handle().map_err(|err| format!("cluster: {err:?}"))?;
    let database = cluster
        .create_temporary_database()
        .map_err(|err| format!("create database: {err:?}"))?;
    let url = database.url().to_string();
    run_pending_migrations(&url).map_err(|err| err.to_string())?;

    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let config = PoolConfig::new(&url)
        .with_max_size(8)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;

    Ok(TestDatabase {
        runtime,
        pool,
        _database: database,
    })
}

/// Keep `PG_PASSWORD` stable so a reused data directory still accepts logins.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster bootstrap spawns any threads.
        unsafe {
            std::env::set_var("PG_PASSWORD", "forum_embedded_test");
        }
    }
}
