mod common;

use sqlx::SqlitePool;
use yatube::application::repos::{FollowsRepo, RepoError};
use yatube::application::subscriptions::SubscriptionError;

use common::TestApp;

#[sqlx::test(migrations = "./migrations")]
async fn follow_then_duplicate_is_conflict(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let follower = app.user("follower").await;
    let author = app.user("author").await;

    app.subscriptions
        .follow(follower.id, author.id)
        .await
        .expect("first follow succeeds");
    assert!(
        app.subscriptions
            .is_following(follower.id, author.id)
            .await
            .expect("lookup")
    );

    let second = app.subscriptions.follow(follower.id, author.id).await;
    assert!(matches!(second, Err(SubscriptionError::Conflict)));
}

#[sqlx::test(migrations = "./migrations")]
async fn self_follow_is_invalid_operation(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let user = app.user("narcissus").await;

    let result = app.subscriptions.follow(user.id, user.id).await;
    assert!(matches!(
        result,
        Err(SubscriptionError::InvalidOperation(_))
    ));
    assert!(
        !app.subscriptions
            .is_following(user.id, user.id)
            .await
            .expect("lookup")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn database_rejects_raw_self_follow(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let user = app.user("narcissus").await;

    let result = app.repos.create_follow(user.id, user.id).await;
    assert!(
        matches!(result, Err(RepoError::Integrity { .. })),
        "unexpected result: {result:?}"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn database_rejects_raw_duplicate_follow(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let follower = app.user("follower").await;
    let author = app.user("author").await;

    app.repos
        .create_follow(follower.id, author.id)
        .await
        .expect("first insert");
    let result = app.repos.create_follow(follower.id, author.id).await;
    assert!(
        matches!(result, Err(RepoError::Duplicate { .. })),
        "unexpected result: {result:?}"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn unfollow_removes_relation_and_is_idempotent(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let follower = app.user("follower").await;
    let author = app.user("author").await;

    app.subscriptions
        .follow(follower.id, author.id)
        .await
        .expect("follow");

    let removed = app
        .subscriptions
        .unfollow(follower.id, author.id)
        .await
        .expect("unfollow");
    assert!(removed);
    assert!(
        !app.subscriptions
            .is_following(follower.id, author.id)
            .await
            .expect("lookup")
    );

    let removed_again = app
        .subscriptions
        .unfollow(follower.id, author.id)
        .await
        .expect("second unfollow is a no-op");
    assert!(!removed_again);
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_by_unknown_username_is_not_found(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let follower = app.user("follower").await;

    let result = app
        .subscriptions
        .follow_by_username(&follower, "ghost")
        .await;
    assert!(matches!(
        result,
        Err(SubscriptionError::NotFound { entity: "author" })
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn following_is_directional(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let a = app.user("alice").await;
    let b = app.user("bob").await;

    app.subscriptions.follow(a.id, b.id).await.expect("follow");

    let forward = app.subscriptions.is_following(a.id, b.id).await;
    let backward = app.subscriptions.is_following(b.id, a.id).await;
    assert!(forward.expect("lookup"));
    assert!(!backward.expect("lookup"));
    app.subscriptions
        .follow(b.id, a.id)
        .await
        .expect("reverse follow is a separate relation");
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_follows_of_one_pair_store_a_single_row(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let follower = app.user("follower").await;
    let author = app.user("author").await;
    let (user_id, author_id) = (follower.id, author.id);

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let service = app.subscriptions.clone();
            tokio::spawn(async move { service.follow(user_id, author_id).await })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for attempt in attempts {
        match attempt.await.expect("follow task") {
            Ok(_) => created += 1,
            Err(SubscriptionError::Conflict) => conflicts += 1,
            Err(other) => panic!("unexpected follow error: {other:?}"),
        }
    }
    assert_eq!((created, conflicts), (1, 15));

    let followers = app
        .repos
        .list_follower_ids(author_id)
        .await
        .expect("followers");
    assert_eq!(followers, vec![user_id]);
}
