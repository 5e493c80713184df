//! Operator CLI for the forum database.
//!
//! Mutating subcommands log in with `--username/--password` on a fresh
//! session and then run through the same facade a server would use.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use forum::domain::{Direction, Forum, PostId, Session, VoteOutcome};
use forum::outbound::persistence::{
    DbPool, DieselPostRepository, DieselUserRepository, DieselVoteLedger, PoolConfig,
    run_pending_migrations,
};
use forum::settings::ForumSettings;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `forum-admin` command arguments.
#[derive(Debug, Parser)]
#[command(name = "forum-admin", about = "Administer forum accounts, posts and votes", version)]
struct Cli {
    /// Database connection URL. Overrides `FORUM_DATABASE_URL`/`DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Register a new account.
    Register(Account),
    /// Publish a post.
    Post {
        #[command(flatten)]
        account: Account,
        /// Post body.
        content: String,
    },
    /// List the most recent posts as JSON.
    List {
        /// Maximum number of posts; defaults to the configured list limit.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Vote on a post.
    Vote {
        #[command(flatten)]
        account: Account,
        /// Target post identifier.
        post_id: PostId,
        /// `up` or `down`.
        direction: Direction,
    },
    /// Compare a post's score with its vote ledger.
    Audit {
        /// Target post identifier.
        post_id: PostId,
    },
}

#[derive(Debug, Args)]
struct Account {
    /// Account name.
    #[arg(long)]
    username: String,
    /// Account password.
    #[arg(long)]
    password: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = ForumSettings::load_from_iter([OsString::from("forum-admin")])
        .wrap_err("failed to load forum settings")?;

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(run(cli, settings))
}

/// Resolve pool settings, letting `--database-url` win over configuration.
fn pool_config(database_url: Option<String>, settings: &ForumSettings) -> Result<PoolConfig> {
    let settings = match database_url {
        Some(url) => settings.clone().with_database_url(url),
        None => settings.clone(),
    };
    PoolConfig::from_settings(&settings)
        .ok_or_else(|| eyre!("no database URL; pass --database-url or set DATABASE_URL"))
}

async fn run(cli: Cli, settings: ForumSettings) -> Result<()> {
    let pool_config = pool_config(cli.database_url, &settings)?;

    if let Command::Migrate = cli.command {
        let database_url = pool_config.database_url().to_owned();
        let applied = tokio::task::spawn_blocking(move || run_pending_migrations(&database_url))
            .await
            .wrap_err("migration task panicked")??;
        println!("applied {applied} migration(s)");
        return Ok(());
    }

    let pool = DbPool::new(pool_config).await?;
    let forum = Forum::new(
        Arc::new(DieselUserRepository::new(pool.clone())),
        Arc::new(DieselPostRepository::new(pool.clone())),
        Arc::new(DieselVoteLedger::new(pool)),
    );

    match cli.command {
        Command::Migrate => {}
        Command::Register(account) => {
            forum.register(&account.username, &account.password).await?;
            println!("registered {}", account.username.trim());
        }
        Command::Post { account, content } => {
            let session = login(&forum, &account).await?;
            let post_id = forum.create_post(&session, &content).await?;
            println!("{post_id}");
        }
        Command::List { limit } => {
            let posts = forum
                .list_posts(limit.unwrap_or_else(|| settings.list_limit()))
                .await?;
            println!("{}", serde_json::to_string_pretty(&posts)?);
        }
        Command::Vote {
            account,
            post_id,
            direction,
        } => {
            let session = login(&forum, &account).await?;
            match forum.vote(&session, &post_id, direction).await? {
                VoteOutcome::Unchanged { direction } => {
                    println!("already voted {direction}; score unchanged");
                }
                VoteOutcome::Applied { score, .. } => println!("score={score}"),
            }
        }
        Command::Audit { post_id } => {
            let audit = forum.audit_score(&post_id).await?;
            println!(
                "stored={} expected={} consistent={}",
                audit.stored,
                audit.expected,
                audit.is_consistent()
            );
        }
    }
    Ok(())
}

async fn login(forum: &Forum, account: &Account) -> Result<Session> {
    let mut session = Session::new();
    forum
        .login(&mut session, &account.username, &account.password)
        .await?;
    Ok(session)
}
