//! In-process adapter implementing every forum port.
//!
//! All relations live behind one mutex, so each port call observes and
//! mutates a consistent snapshot. Intended for tests and embedding; state is
//! lost when the store is dropped.

use std::collections::HashMap;
#[cfg(any(test, feature = "test-support"))]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    PostRepository, PostRepositoryError, UserPersistenceError, UserRepository, VoteLedger,
    VoteLedgerError,
};
use crate::domain::{Direction, Post, PostId, User, Username, VoteChange, VoteCommit, VoteTally};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Username, User>,
    posts: HashMap<PostId, Post>,
    votes: HashMap<(Username, PostId), Direction>,
}

const POISONED: &str = "in-memory store lock poisoned";

/// Mutex-guarded forum store.
#[derive(Debug, Default)]
pub struct InMemoryForumStore {
    tables: Mutex<Tables>,
    #[cfg(any(test, feature = "test-support"))]
    fail_next_commit: AtomicBool,
}

impl InMemoryForumStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`VoteLedger::commit`] fail after validation.
    ///
    /// The failing commit writes neither the score nor the ledger entry.
    /// Only built with the `test-support` feature.
    #[cfg(any(test, feature = "test-support"))]
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    #[cfg(any(test, feature = "test-support"))]
    fn take_injected_failure(&self) -> bool {
        self.fail_next_commit.swap(false, Ordering::SeqCst)
    }

    #[cfg(not(any(test, feature = "test-support")))]
    fn take_injected_failure(&self) -> bool {
        false
    }

    fn lock(&self) -> Option<MutexGuard<'_, Tables>> {
        self.tables.lock().ok()
    }
}

fn newest_first(a: &Post, b: &Post) -> std::cmp::Ordering {
    fn key(post: &Post) -> (DateTime<Utc>, &PostId) {
        (post.created_at, &post.id)
    }
    key(b).cmp(&key(a))
}

#[async_trait]
impl UserRepository for InMemoryForumStore {
    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut tables = self
            .lock()
            .ok_or_else(|| UserPersistenceError::query(POISONED))?;
        if tables.users.contains_key(user.username()) {
            return Err(UserPersistenceError::duplicate_username(
                user.username().as_ref(),
            ));
        }
        tables.users.insert(user.username().clone(), user.clone());
        Ok(())
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError> {
        let tables = self
            .lock()
            .ok_or_else(|| UserPersistenceError::query(POISONED))?;
        Ok(tables.users.get(username).cloned())
    }
}

#[async_trait]
impl PostRepository for InMemoryForumStore {
    async fn insert(&self, post: &Post) -> Result<(), PostRepositoryError> {
        let mut tables = self
            .lock()
            .ok_or_else(|| PostRepositoryError::query(POISONED))?;
        if !tables.users.contains_key(&post.author) {
            return Err(PostRepositoryError::query(format!(
                "author {} is not registered",
                post.author
            )));
        }
        if tables.posts.contains_key(&post.id) {
            return Err(PostRepositoryError::query(format!(
                "post id {} already exists",
                post.id
            )));
        }
        tables.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PostId) -> Result<Option<Post>, PostRepositoryError> {
        let tables = self
            .lock()
            .ok_or_else(|| PostRepositoryError::query(POISONED))?;
        Ok(tables.posts.get(id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Post>, PostRepositoryError> {
        let tables = self
            .lock()
            .ok_or_else(|| PostRepositoryError::query(POISONED))?;
        let mut posts: Vec<Post> = tables.posts.values().cloned().collect();
        posts.sort_by(newest_first);
        posts.truncate(limit);
        Ok(posts)
    }

    async fn set_score(&self, id: &PostId, score: i64) -> Result<(), PostRepositoryError> {
        let mut tables = self
            .lock()
            .ok_or_else(|| PostRepositoryError::query(POISONED))?;
        let post = tables
            .posts
            .get_mut(id)
            .ok_or_else(|| PostRepositoryError::not_found(id.as_ref()))?;
        post.score = score;
        Ok(())
    }

    async fn increment_score(&self, id: &PostId, delta: i64) -> Result<i64, PostRepositoryError> {
        let mut tables = self
            .lock()
            .ok_or_else(|| PostRepositoryError::query(POISONED))?;
        let post = tables
            .posts
            .get_mut(id)
            .ok_or_else(|| PostRepositoryError::not_found(id.as_ref()))?;
        post.score = post
            .score
            .checked_add(delta)
            .ok_or_else(|| PostRepositoryError::query("score overflow"))?;
        Ok(post.score)
    }
}

#[async_trait]
impl VoteLedger for InMemoryForumStore {
    async fn get_vote(
        &self,
        voter: &Username,
        post_id: &PostId,
    ) -> Result<Option<Direction>, VoteLedgerError> {
        let tables = self.lock().ok_or_else(|| VoteLedgerError::query(POISONED))?;
        Ok(tables
            .votes
            .get(&(voter.clone(), post_id.clone()))
            .copied())
    }

    async fn record_or_update_vote(
        &self,
        voter: &Username,
        post_id: &PostId,
        direction: Direction,
    ) -> Result<(), VoteLedgerError> {
        let mut tables = self.lock().ok_or_else(|| VoteLedgerError::query(POISONED))?;
        if !tables.users.contains_key(voter) {
            return Err(VoteLedgerError::missing_reference(format!("voter {voter}")));
        }
        if !tables.posts.contains_key(post_id) {
            return Err(VoteLedgerError::missing_reference(format!("post {post_id}")));
        }
        tables.votes.insert((voter.clone(), post_id.clone()), direction);
        Ok(())
    }

    async fn commit(&self, change: &VoteChange) -> Result<VoteCommit, VoteLedgerError> {
        let mut tables = self.lock().ok_or_else(|| VoteLedgerError::query(POISONED))?;
        let Some(score) = tables.posts.get(&change.post_id).map(|post| post.score) else {
            return Ok(VoteCommit::PostNotFound);
        };
        if !tables.users.contains_key(&change.voter) {
            return Err(VoteLedgerError::missing_reference(format!("voter {}", change.voter)));
        }

        let key = (change.voter.clone(), change.post_id.clone());
        let current = tables.votes.get(&key).copied();
        if current != change.previous {
            return Ok(VoteCommit::Stale { current });
        }

        let next_score = score
            .checked_add(change.score_delta)
            .ok_or_else(|| VoteLedgerError::query("score overflow"))?;
        if self.take_injected_failure() {
            return Err(VoteLedgerError::query("injected commit failure"));
        }

        if let Some(post) = tables.posts.get_mut(&change.post_id) {
            post.score = next_score;
        }
        tables.votes.insert(key, change.next);
        Ok(VoteCommit::Applied { score: next_score })
    }

    async fn tally(&self, post_id: &PostId) -> Result<VoteTally, VoteLedgerError> {
        let tables = self.lock().ok_or_else(|| VoteLedgerError::query(POISONED))?;
        let tally = tables
            .votes
            .iter()
            .filter(|((_, voted_on), _)| voted_on == post_id)
            .fold(VoteTally::default(), |mut tally, (_, direction)| {
                match direction {
                    Direction::Up => tally.up += 1,
                    Direction::Down => tally.down += 1,
                }
                tally
            });
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the in-memory adapter.
    use chrono::Duration;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::{PasswordDigest, PostContent};

    fn username(raw: &str) -> Username {
        Username::new(raw).expect("valid name")
    }

    fn post_at(offset_secs: i64) -> Post {
        Post::draft(
            username("alice"),
            PostContent::new("hello").expect("valid content"),
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[fixture]
    async fn store() -> InMemoryForumStore {
        let store = InMemoryForumStore::new();
        UserRepository::insert(
            &store,
            &User::new(username("alice"), PasswordDigest::generate("pw1")),
        )
        .await
        .expect("seed user");
        store
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_usernames_are_rejected(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let err = UserRepository::insert(
            &store,
            &User::new(username("alice"), PasswordDigest::generate("other")),
        )
        .await
        .expect_err("duplicate");

        assert!(matches!(err, UserPersistenceError::DuplicateUsername { .. }));
        let kept = store
            .find_by_username(&username("alice"))
            .await
            .expect("lookup")
            .expect("user kept");
        assert!(kept.password().matches("pw1"));
    }

    #[rstest]
    #[tokio::test]
    async fn list_recent_orders_newest_first(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let older = post_at(-10);
        let newer = post_at(0);
        PostRepository::insert(&store, &older).await.expect("insert");
        PostRepository::insert(&store, &newer).await.expect("insert");

        let listed = store.list_recent(10).await.expect("list");
        let ids: Vec<_> = listed.iter().map(|post| post.id.clone()).collect();
        assert_eq!(ids, vec![newer.id.clone(), older.id.clone()]);

        assert_eq!(store.list_recent(1).await.expect("list").len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn score_updates_require_existing_post(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let missing = PostId::random();

        assert!(matches!(
            store.set_score(&missing, 5).await,
            Err(PostRepositoryError::NotFound { .. })
        ));
        assert!(matches!(
            store.increment_score(&missing, 1).await,
            Err(PostRepositoryError::NotFound { .. })
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn increment_returns_new_score(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let post = post_at(0);
        PostRepository::insert(&store, &post).await.expect("insert");

        assert_eq!(store.increment_score(&post.id, 2).await, Ok(3));
        store.set_score(&post.id, 10).await.expect("overwrite");
        assert_eq!(store.increment_score(&post.id, -1).await, Ok(9));
    }

    #[rstest]
    #[tokio::test]
    async fn record_or_update_keeps_one_entry(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let post = post_at(0);
        PostRepository::insert(&store, &post).await.expect("insert");
        let alice = username("alice");

        for direction in [Direction::Up, Direction::Up, Direction::Down] {
            store
                .record_or_update_vote(&alice, &post.id, direction)
                .await
                .expect("upsert");
        }

        assert_eq!(
            store.get_vote(&alice, &post.id).await,
            Ok(Some(Direction::Down))
        );
        assert_eq!(
            store.tally(&post.id).await,
            Ok(VoteTally { up: 0, down: 1 })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn record_requires_known_references(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let err = store
            .record_or_update_vote(&username("alice"), &PostId::random(), Direction::Up)
            .await
            .expect_err("missing post");

        assert!(matches!(err, VoteLedgerError::MissingReference { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn commit_detects_stale_plans(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let post = post_at(0);
        PostRepository::insert(&store, &post).await.expect("insert");
        let alice = username("alice");
        store
            .record_or_update_vote(&alice, &post.id, Direction::Up)
            .await
            .expect("seed vote");

        let change = VoteChange::plan(&alice, &post.id, None, Direction::Down)
            .expect("first vote plan");
        assert_eq!(
            store.commit(&change).await,
            Ok(VoteCommit::Stale {
                current: Some(Direction::Up)
            })
        );
        assert_eq!(
            store.find_by_id(&post.id).await.expect("lookup").map(|p| p.score),
            Some(1)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn injected_failure_writes_nothing(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let post = post_at(0);
        PostRepository::insert(&store, &post).await.expect("insert");
        let alice = username("alice");
        let change = VoteChange::plan(&alice, &post.id, None, Direction::Up)
            .expect("first vote plan");

        store.fail_next_commit();
        assert!(store.commit(&change).await.is_err());
        assert_eq!(store.get_vote(&alice, &post.id).await, Ok(None));

        assert_eq!(
            store.commit(&change).await,
            Ok(VoteCommit::Applied { score: 2 })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn commit_on_missing_post_reports_not_found(#[future] store: InMemoryForumStore) {
        let store = store.await;
        let change = VoteChange::plan(&username("alice"), &PostId::random(), None, Direction::Up)
            .expect("first vote plan");

        assert_eq!(store.commit(&change).await, Ok(VoteCommit::PostNotFound));
    }
}
