//! Score/ledger consistency properties exercised through the forum facade
//! over the in-memory store.
use std::sync::Arc;

use forum::domain::ports::{PostRepository, VoteLedger};
use forum::domain::{
    Direction, ErrorCode, Forum, PostId, RegistrationError, Session, Username, VoteOutcome,
    VoteTransition,
};
use forum::outbound::memory::InMemoryForumStore;
use rstest::{fixture, rstest};

struct Harness {
    store: Arc<InMemoryForumStore>,
    forum: Forum,
}

impl Harness {
    async fn session(&self, username: &str, password: &str) -> Session {
        let mut session = Session::new();
        self.forum
            .login(&mut session, username, password)
            .await
            .expect("login succeeds");
        session
    }

    async fn score(&self, post_id: &PostId) -> i64 {
        self.forum.get_post(post_id).await.expect("post exists").score
    }

    async fn vote_of(&self, username: &str, post_id: &PostId) -> Option<Direction> {
        let voter = Username::new(username).expect("valid name");
        self.store
            .get_vote(&voter, post_id)
            .await
            .expect("ledger lookup")
    }
}

#[fixture]
async fn harness() -> Harness {
    let store = Arc::new(InMemoryForumStore::new());
    let forum = Forum::from_store(Arc::clone(&store));
    for (name, password) in [("alice", "pw1"), ("bob", "pw2"), ("carol", "pw3")] {
        forum
            .register(name, password)
            .await
            .expect("registration succeeds");
    }
    Harness { store, forum }
}

async fn post_by_alice(harness: &Harness) -> PostId {
    let session = harness.session("alice", "pw1").await;
    harness
        .forum
        .create_post(&session, "hello")
        .await
        .expect("post created")
}

#[rstest]
#[tokio::test]
async fn new_posts_start_at_one(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;

    assert_eq!(harness.score(&post_id).await, 1);
    let audit = harness.forum.audit_score(&post_id).await.expect("audit");
    assert!(audit.is_consistent());
}

#[rstest]
#[case(Direction::Up, 2)]
#[case(Direction::Down, 0)]
#[tokio::test]
async fn repeated_votes_are_idempotent(
    #[future] harness: Harness,
    #[case] direction: Direction,
    #[case] expected: i64,
) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;
    let bob = harness.session("bob", "pw2").await;

    harness
        .forum
        .vote(&bob, &post_id, direction)
        .await
        .expect("first vote");
    let repeat = harness
        .forum
        .vote(&bob, &post_id, direction)
        .await
        .expect("repeat vote");

    assert_eq!(repeat, VoteOutcome::Unchanged { direction });
    assert_eq!(harness.score(&post_id).await, expected);
    assert_eq!(harness.vote_of("bob", &post_id).await, Some(direction));
}

#[rstest]
#[case(Direction::Up, Direction::Down, 0)]
#[case(Direction::Down, Direction::Up, 2)]
#[tokio::test]
async fn switching_reverses_then_applies(
    #[future] harness: Harness,
    #[case] first: Direction,
    #[case] second: Direction,
    #[case] expected: i64,
) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;
    let bob = harness.session("bob", "pw2").await;

    harness
        .forum
        .vote(&bob, &post_id, first)
        .await
        .expect("first vote");
    let outcome = harness
        .forum
        .vote(&bob, &post_id, second)
        .await
        .expect("switch");

    assert_eq!(
        outcome,
        VoteOutcome::Applied {
            transition: VoteTransition::Switched {
                delta: second.weight() - first.weight()
            },
            score: expected,
        }
    );
    assert_eq!(harness.vote_of("bob", &post_id).await, Some(second));
    let tally = harness.store.tally(&post_id).await.expect("tally");
    assert_eq!(tally.up + tally.down, 1);
}

#[rstest]
#[tokio::test]
async fn documented_scenario(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;
    let bob = harness.session("bob", "pw2").await;
    let carol = harness.session("carol", "pw3").await;

    harness
        .forum
        .vote(&bob, &post_id, Direction::Up)
        .await
        .expect("bob up");
    assert_eq!(harness.score(&post_id).await, 2);

    harness
        .forum
        .vote(&carol, &post_id, Direction::Up)
        .await
        .expect("carol up");
    assert_eq!(harness.score(&post_id).await, 3);

    harness
        .forum
        .vote(&bob, &post_id, Direction::Down)
        .await
        .expect("bob switches");
    assert_eq!(harness.score(&post_id).await, 1);

    harness
        .forum
        .vote(&bob, &post_id, Direction::Down)
        .await
        .expect("bob repeats");
    assert_eq!(harness.score(&post_id).await, 1);

    let audit = harness.forum.audit_score(&post_id).await.expect("audit");
    assert!(audit.is_consistent());
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_votes_are_not_lost(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;

    let voters: Vec<String> = (0..32).map(|n| format!("voter{n}")).collect();
    for voter in &voters {
        harness
            .forum
            .register(voter, "pw")
            .await
            .expect("register voter");
    }

    let mut tasks = Vec::new();
    for (index, voter) in voters.iter().enumerate() {
        let forum = harness.forum.clone();
        let post_id = post_id.clone();
        let voter = voter.clone();
        tasks.push(tokio::spawn(async move {
            let mut session = Session::new();
            forum
                .login(&mut session, &voter, "pw")
                .await
                .expect("voter login");
            let direction = if index % 4 == 0 {
                Direction::Down
            } else {
                Direction::Up
            };
            forum
                .vote(&session, &post_id, direction)
                .await
                .expect("vote applied");
            // Every fourth voter switches back up.
            if direction == Direction::Down {
                forum
                    .vote(&session, &post_id, Direction::Up)
                    .await
                    .expect("switch applied");
            }
        }));
    }
    for task in tasks {
        task.await.expect("vote task");
    }

    assert_eq!(harness.score(&post_id).await, 1 + 32);
    let audit = harness.forum.audit_score(&post_id).await.expect("audit");
    assert!(audit.is_consistent());
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_up_and_down_votes_net_out(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;
    let bob = harness.session("bob", "pw2").await;
    let carol = harness.session("carol", "pw3").await;

    let up = {
        let forum = harness.forum.clone();
        let post_id = post_id.clone();
        tokio::spawn(async move { forum.vote(&bob, &post_id, Direction::Up).await })
    };
    let down = {
        let forum = harness.forum.clone();
        let post_id = post_id.clone();
        tokio::spawn(async move { forum.vote(&carol, &post_id, Direction::Down).await })
    };
    up.await.expect("up task").expect("up applied");
    down.await.expect("down task").expect("down applied");

    assert_eq!(harness.score(&post_id).await, 1);
    assert_eq!(harness.vote_of("bob", &post_id).await, Some(Direction::Up));
    assert_eq!(
        harness.vote_of("carol", &post_id).await,
        Some(Direction::Down)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_by_one_voter_stay_consistent(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;
    let bob = harness.session("bob", "pw2").await;

    let mut tasks = Vec::new();
    for n in 0..16 {
        let forum = harness.forum.clone();
        let session = bob.clone();
        let post_id = post_id.clone();
        let direction = if n % 2 == 0 {
            Direction::Up
        } else {
            Direction::Down
        };
        tasks.push(tokio::spawn(async move {
            forum.vote(&session, &post_id, direction).await
        }));
    }
    for task in tasks {
        if let Err(err) = task.await.expect("vote task") {
            assert_eq!(err.code(), ErrorCode::Conflict);
        }
    }

    let audit = harness.forum.audit_score(&post_id).await.expect("audit");
    assert!(audit.is_consistent());
    let final_vote = harness.vote_of("bob", &post_id).await.expect("bob voted");
    assert_eq!(harness.score(&post_id).await, 1 + final_vote.weight());
}

#[rstest]
#[tokio::test]
async fn failed_commit_changes_nothing(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;
    let bob = harness.session("bob", "pw2").await;
    harness
        .forum
        .vote(&bob, &post_id, Direction::Up)
        .await
        .expect("initial vote");

    harness.store.fail_next_commit();
    let err = harness
        .forum
        .vote(&bob, &post_id, Direction::Down)
        .await
        .expect_err("injected failure");

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(harness.score(&post_id).await, 2);
    assert_eq!(harness.vote_of("bob", &post_id).await, Some(Direction::Up));
}

#[rstest]
#[tokio::test]
async fn duplicate_registration_keeps_original_password(#[future] harness: Harness) {
    let harness = harness.await;

    let err = harness
        .forum
        .register("alice", "other")
        .await
        .expect_err("duplicate");

    assert!(matches!(err, RegistrationError::DuplicateUsername { .. }));
    assert_eq!(harness.forum.verify_credentials("alice", "pw1").await, Ok(true));
    assert_eq!(
        harness.forum.verify_credentials("alice", "other").await,
        Ok(false)
    );
}

#[rstest]
#[case("alice", "pw1", true)]
#[case("alice", "pw2", false)]
#[case("dave", "pw1", false)]
#[case("", "", false)]
#[tokio::test]
async fn credentials_round_trip(
    #[future] harness: Harness,
    #[case] username: &str,
    #[case] password: &str,
    #[case] expected: bool,
) {
    let harness = harness.await;
    assert_eq!(
        harness.forum.verify_credentials(username, password).await,
        Ok(expected)
    );
}

#[rstest]
#[tokio::test]
async fn anonymous_sessions_cannot_write(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;
    let anonymous = Session::new();

    let post_err = harness
        .forum
        .create_post(&anonymous, "hi")
        .await
        .expect_err("anonymous post");
    let vote_err = harness
        .forum
        .vote(&anonymous, &post_id, Direction::Up)
        .await
        .expect_err("anonymous vote");

    assert_eq!(post_err.code(), ErrorCode::Unauthorized);
    assert_eq!(vote_err.code(), ErrorCode::Unauthorized);
    assert_eq!(harness.score(&post_id).await, 1);
}

#[rstest]
#[tokio::test]
async fn listing_is_newest_first_and_clamped(#[future] harness: Harness) {
    let harness = harness.await;
    let mut created = Vec::new();
    for _ in 0..3 {
        created.push(post_by_alice(&harness).await);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let listed = harness.forum.list_posts(2).await.expect("list");
    let ids: Vec<_> = listed.into_iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![created[2].clone(), created[1].clone()]);

    assert!(harness.forum.list_posts(0).await.expect("list").is_empty());
    assert_eq!(harness.forum.list_posts(1_000).await.expect("list").len(), 3);
}

#[rstest]
#[tokio::test]
async fn administrative_overwrite_shows_up_in_audit(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;

    harness.store.set_score(&post_id, 10).await.expect("overwrite");
    let audit = harness.forum.audit_score(&post_id).await.expect("audit");

    assert_eq!(audit.stored, 10);
    assert_eq!(audit.expected, 1);
    assert!(!audit.is_consistent());
}

#[rstest]
#[tokio::test]
async fn direct_ledger_upsert_keeps_single_entry(#[future] harness: Harness) {
    let harness = harness.await;
    let post_id = post_by_alice(&harness).await;
    let bob = Username::new("bob").expect("valid name");

    for direction in [Direction::Down, Direction::Up, Direction::Up] {
        harness
            .store
            .record_or_update_vote(&bob, &post_id, direction)
            .await
            .expect("upsert");
    }

    let tally = harness.store.tally(&post_id).await.expect("tally");
    assert_eq!((tally.up, tally.down), (1, 0));
    assert_eq!(harness.vote_of("bob", &post_id).await, Some(Direction::Up));
    // The ledger-only write bypasses the score.
    assert_eq!(harness.score(&post_id).await, 1);
}
