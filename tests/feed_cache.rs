mod common;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::Notify;
use uuid::Uuid;
use yatube::application::feed::{FeedError, FeedScope, FeedService};
use yatube::application::pagination::{Page, PageRequest};
use yatube::application::repos::{PostListScope, PostsRepo, PostsWriteRepo, RepoError};
use yatube::cache::{CacheConfig, FeedKey};
use yatube::domain::entities::PostRecord;

use common::{PAGE_SIZE, TestApp};

fn texts(page: &Page<PostRecord>) -> Vec<String> {
    page.items.iter().map(|post| post.text.clone()).collect()
}

#[sqlx::test(migrations = "./migrations")]
async fn stale_page_survives_raw_delete_until_cleared(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("SteveJ").await;
    let post = app.post(&author, "cache-cache-cache", None).await;

    let first = app.feed.get_page(FeedScope::All, 1).await.expect("feed");
    assert!(texts(&first).contains(&"cache-cache-cache".to_string()));

    // Bypasses the post workflow, so nothing invalidates the cached page.
    assert!(app.repos.delete_post(post.id).await.expect("raw delete"));

    let stale = app.feed.get_page(FeedScope::All, 1).await.expect("feed");
    assert!(texts(&stale).contains(&"cache-cache-cache".to_string()));

    app.cache.clear_all();

    let fresh = app.feed.get_page(FeedScope::All, 1).await.expect("feed");
    assert!(!texts(&fresh).contains(&"cache-cache-cache".to_string()));
}

#[sqlx::test(migrations = "./migrations")]
async fn thirteen_posts_split_across_two_pages(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("SteveJ").await;
    let group = app.group("Test group", "test-slug1").await;
    for n in 0..13 {
        app.post(&author, &format!("post number {n}"), Some(&group.slug))
            .await;
    }

    let scopes = [
        FeedScope::All,
        FeedScope::ByGroup(group.slug.clone()),
        FeedScope::ByAuthor(author.username.clone()),
    ];
    for scope in scopes {
        let first = app.feed.get_page(scope.clone(), 1).await.expect("page 1");
        assert_eq!(first.len(), 10, "{scope:?} page 1");
        assert_eq!(first.total, 13);
        assert!(first.has_next());

        let second = app.feed.get_page(scope.clone(), 2).await.expect("page 2");
        assert_eq!(second.len(), 3, "{scope:?} page 2");
        assert!(!second.has_next());

        let third = app.feed.get_page(scope.clone(), 3).await.expect("page 3");
        assert!(third.is_empty(), "{scope:?} page 3");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn pages_are_newest_first(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("SteveJ").await;
    app.post(&author, "older", None).await;
    app.post(&author, "newer", None).await;

    let page = app.feed.get_page(FeedScope::All, 1).await.expect("feed");
    assert_eq!(texts(&page), vec!["newer".to_string(), "older".to_string()]);
}

#[sqlx::test(migrations = "./migrations")]
async fn group_feed_contains_only_its_posts(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("SteveJ").await;
    let first = app.group("First", "test-slug1").await;
    let second = app.group("Second", "test-slug2").await;
    app.post(&author, "in first", Some(&first.slug)).await;
    app.post(&author, "in second", Some(&second.slug)).await;
    app.post(&author, "in no group", None).await;

    let page = app
        .feed
        .get_page(FeedScope::ByGroup(second.slug.clone()), 1)
        .await
        .expect("group feed");
    assert_eq!(texts(&page), vec!["in second".to_string()]);
    assert!(
        page.items
            .iter()
            .all(|post| post.group_slug.as_deref() == Some("test-slug2"))
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_group_and_author_are_not_found(pool: SqlitePool) {
    let app = TestApp::new(pool);

    let group = app
        .feed
        .get_page(FeedScope::ByGroup("missing".to_string()), 1)
        .await;
    assert!(matches!(
        group,
        Err(FeedError::NotFound { entity: "group" })
    ));

    let author = app.feed.profile("ghost", None, 1).await;
    assert!(matches!(author, Err(FeedError::NotFound { .. })));
}

#[sqlx::test(migrations = "./migrations")]
async fn follower_feed_tracks_follows_immediately(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let reader = app.user("reader").await;
    let followed = app.user("followed").await;
    let stranger = app.user("stranger").await;
    app.post(&followed, "from followed", None).await;
    app.post(&stranger, "from stranger", None).await;

    let before = app
        .feed
        .get_page(FeedScope::ByFollower(reader.id), 1)
        .await
        .expect("empty follower feed");
    assert!(before.is_empty());

    app.subscriptions
        .follow(reader.id, followed.id)
        .await
        .expect("follow");

    let after = app
        .feed
        .get_page(FeedScope::ByFollower(reader.id), 1)
        .await
        .expect("follower feed");
    assert_eq!(texts(&after), vec!["from followed".to_string()]);

    app.subscriptions
        .unfollow(reader.id, followed.id)
        .await
        .expect("unfollow");
    let emptied = app
        .feed
        .get_page(FeedScope::ByFollower(reader.id), 1)
        .await
        .expect("follower feed");
    assert!(emptied.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn new_post_reaches_followers_with_cached_feeds(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let reader = app.user("reader").await;
    let author = app.user("author").await;
    app.subscriptions
        .follow(reader.id, author.id)
        .await
        .expect("follow");

    let cached = app
        .feed
        .get_page(FeedScope::ByFollower(reader.id), 1)
        .await
        .expect("follower feed");
    assert!(cached.is_empty());
    assert!(app.cache.get(&FeedKey::follow(reader.id, 1)).is_some());

    app.post(&author, "fresh for followers", None).await;

    let page = app
        .feed
        .get_page(FeedScope::ByFollower(reader.id), 1)
        .await
        .expect("follower feed");
    assert_eq!(texts(&page), vec!["fresh for followers".to_string()]);
}

#[sqlx::test(migrations = "./migrations")]
async fn created_post_is_visible_after_cached_read(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("SteveJ").await;
    app.post(&author, "first", None).await;

    app.feed.get_page(FeedScope::All, 1).await.expect("warm");
    assert!(app.cache.get(&FeedKey::index(1)).is_some());

    app.post(&author, "second", None).await;

    let page = app.feed.get_page(FeedScope::All, 1).await.expect("feed");
    assert_eq!(
        texts(&page),
        vec!["second".to_string(), "first".to_string()]
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn moving_a_post_refreshes_both_group_feeds(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("SteveJ").await;
    let first = app.group("First", "test-slug1").await;
    let second = app.group("Second", "test-slug2").await;
    let post = app.post(&author, "wanderer", Some(&first.slug)).await;

    for slug in [&first.slug, &second.slug] {
        app.feed
            .get_page(FeedScope::ByGroup(slug.clone()), 1)
            .await
            .expect("warm group feed");
    }

    app.posts
        .edit_post(
            &author,
            post.id,
            yatube::application::posts::PostInput {
                text: "wanderer".to_string(),
                group_slug: Some(second.slug.clone()),
                image: None,
            },
        )
        .await
        .expect("edit");

    let old_group = app
        .feed
        .get_page(FeedScope::ByGroup(first.slug.clone()), 1)
        .await
        .expect("old group");
    assert!(old_group.is_empty());

    let new_group = app
        .feed
        .get_page(FeedScope::ByGroup(second.slug.clone()), 1)
        .await
        .expect("new group");
    assert_eq!(texts(&new_group), vec!["wanderer".to_string()]);
}

#[sqlx::test(migrations = "./migrations")]
async fn profile_reports_count_and_following(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let reader = app.user("reader").await;
    let author = app.user("author").await;
    app.post(&author, "one", None).await;
    app.post(&author, "two", None).await;

    let anonymous = app.feed.profile("author", None, 1).await.expect("profile");
    assert_eq!(anonymous.post_count, 2);
    assert!(!anonymous.following);

    app.subscriptions
        .follow(reader.id, author.id)
        .await
        .expect("follow");
    let followed = app
        .feed
        .profile("author", Some(reader.id), 1)
        .await
        .expect("profile");
    assert!(followed.following);
    assert_eq!(followed.page.len(), 2);
}

/// Holds every listing after its storage read until the test releases it.
struct PausedReads {
    inner: Arc<dyn PostsRepo>,
    read_done: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl PostsRepo for PausedReads {
    async fn list_posts(
        &self,
        scope: PostListScope,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError> {
        let listed = self.inner.list_posts(scope, page).await?;
        self.read_done.notify_one();
        self.release.notified().await;
        Ok(listed)
    }

    async fn find_post_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.inner.find_post_by_id(id).await
    }

    async fn count_posts_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        self.inner.count_posts_by_author(author_id).await
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn post_created_during_a_fill_is_visible_on_next_read(pool: SqlitePool) {
    let app = TestApp::with_cache(
        pool,
        CacheConfig {
            ttl_seconds: 0,
            ..Default::default()
        },
    );
    let author = app.user("SteveJ").await;

    let read_done = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let paused = FeedService::new(
        Arc::new(PausedReads {
            inner: app.repos.clone(),
            read_done: read_done.clone(),
            release: release.clone(),
        }),
        app.repos.clone(),
        app.repos.clone(),
        app.repos.clone(),
        app.cache.clone(),
        PAGE_SIZE,
    );

    let reader = tokio::spawn(async move { paused.get_page(FeedScope::All, 1).await });
    read_done.notified().await;

    app.post(&author, "written mid-read", None).await;
    release.notify_one();

    let raced = reader.await.expect("reader task").expect("feed");
    assert!(raced.is_empty());
    assert!(app.cache.get(&FeedKey::index(1)).is_none());

    let next = app.feed.get_page(FeedScope::All, 1).await.expect("feed");
    assert_eq!(texts(&next), vec!["written mid-read".to_string()]);
}
