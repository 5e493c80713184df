//! Forum facade.
//!
//! Ties the credential store, post store and vote coordinator together behind
//! one API. Every operation that acts on behalf of a user takes the caller's
//! [`Session`] and passes through [`Forum::authorize`], which re-verifies the
//! held credentials against the credential store before anything is written.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::credential_service::map_user_persistence_error;
use crate::domain::ports::{PostRepository, UserRepository, VoteLedger};
use crate::domain::post_service::map_post_repository_error;
use crate::domain::vote_coordinator::map_vote_ledger_error;
use crate::domain::{
    CredentialService, Direction, Error, LoginCredentials, Post, PostContent, PostId,
    PostService, RegistrationError, ScoreAudit, Session, Username, VoteCoordinator, VoteOutcome,
};

/// Entry point for forum operations.
#[derive(Clone)]
pub struct Forum {
    credentials: CredentialService<dyn UserRepository>,
    posts: PostService<dyn PostRepository>,
    votes: VoteCoordinator<dyn VoteLedger>,
    ledger: Arc<dyn VoteLedger>,
}

impl Forum {
    /// Build a facade over separate adapters for each port.
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        ledger: Arc<dyn VoteLedger>,
    ) -> Self {
        Self {
            credentials: CredentialService::new(users),
            posts: PostService::new(posts),
            votes: VoteCoordinator::new(Arc::clone(&ledger)),
            ledger,
        }
    }

    /// Build a facade over one adapter implementing every port.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + PostRepository + VoteLedger + 'static,
    {
        let users: Arc<dyn UserRepository> = store.clone();
        let posts: Arc<dyn PostRepository> = store.clone();
        let ledger: Arc<dyn VoteLedger> = store;
        Self::new(users, posts, ledger)
    }

    /// Register a new account.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), RegistrationError> {
        self.credentials.register(username, password).await
    }

    /// Check a username/password pair without touching any session.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<bool, Error> {
        self.credentials
            .verify(username, password)
            .await
            .map_err(map_user_persistence_error)
    }

    /// Log `session` in as `username`.
    ///
    /// The session is only modified when verification succeeds.
    pub async fn login(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<(), Error> {
        let credentials = LoginCredentials::try_from_parts(username, password)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let verified = self
            .credentials
            .verify_credentials(&credentials)
            .await
            .map_err(map_user_persistence_error)?;
        if !verified {
            return Err(Error::unauthorized("invalid username or password"));
        }

        info!(username = %credentials.username(), "session logged in");
        session.set(credentials);
        Ok(())
    }

    /// Drop the identity held by `session`.
    pub fn logout(&self, session: &mut Session) {
        session.clear();
    }

    /// Username held by `session`, without re-verification.
    pub fn current_identity<'a>(&self, session: &'a Session) -> Option<&'a Username> {
        session.username()
    }

    /// Re-verify the identity held by `session`.
    ///
    /// A failed check rejects the request but leaves the session as it was.
    pub async fn authorize(&self, session: &Session) -> Result<Username, Error> {
        let Some(credentials) = session.current() else {
            return Err(Error::unauthorized("login required"));
        };

        let verified = self
            .credentials
            .verify_credentials(credentials)
            .await
            .map_err(map_user_persistence_error)?;
        if !verified {
            warn!(username = %credentials.username(), "session credentials failed re-verification");
            return Err(Error::unauthorized("session credentials are no longer valid"));
        }
        Ok(credentials.username().clone())
    }

    /// Publish a post as the session's user.
    pub async fn create_post(&self, session: &Session, content: &str) -> Result<PostId, Error> {
        let author = self.authorize(session).await?;
        let content =
            PostContent::new(content).map_err(|err| Error::invalid_request(err.to_string()))?;
        self.posts
            .create(&author, content)
            .await
            .map_err(map_post_repository_error)
    }

    /// Most recent posts first. Needs no session.
    pub async fn list_posts(&self, limit: usize) -> Result<Vec<Post>, Error> {
        self.posts.list(limit).await.map_err(map_post_repository_error)
    }

    /// Fetch one post.
    pub async fn get_post(&self, post_id: &PostId) -> Result<Post, Error> {
        self.posts
            .get(post_id)
            .await
            .map_err(map_post_repository_error)?
            .ok_or_else(|| Error::not_found(format!("post {post_id} not found")))
    }

    /// Vote on a post as the session's user.
    pub async fn vote(
        &self,
        session: &Session,
        post_id: &PostId,
        direction: Direction,
    ) -> Result<VoteOutcome, Error> {
        let voter = self.authorize(session).await?;
        Ok(self.votes.apply_vote(&voter, post_id, direction).await?)
    }

    /// Compare a post's stored score with the score implied by its votes.
    ///
    /// The two reads are separate, so a vote committed in between can make a
    /// consistent post look inconsistent; re-run the audit before acting on it.
    pub async fn audit_score(&self, post_id: &PostId) -> Result<ScoreAudit, Error> {
        let post = self.get_post(post_id).await?;
        let tally = self
            .ledger
            .tally(post_id)
            .await
            .map_err(map_vote_ledger_error)?;
        let audit = ScoreAudit {
            stored: post.score,
            expected: tally.expected_score(),
        };
        if !audit.is_consistent() {
            warn!(
                %post_id,
                stored = audit.stored,
                expected = audit.expected,
                "post score disagrees with vote ledger"
            );
        }
        Ok(audit)
    }
}

#[cfg(test)]
#[path = "forum_tests.rs"]
mod tests;
