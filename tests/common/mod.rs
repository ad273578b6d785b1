//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use yatube::{
    application::{
        feed::FeedService,
        posts::{PostInput, PostService},
        repos::{
            CommentsRepo, CreateGroupParams, CreateUserParams, FollowsRepo, GroupsRepo, PostsRepo,
            PostsWriteRepo, UsersRepo,
        },
        subscriptions::SubscriptionService,
    },
    cache::{CacheConfig, CacheTrigger, FeedCache},
    config::AuthSettings,
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    infra::{
        db::SqliteRepositories,
        http::{HttpState, build_router},
    },
};

pub const PAGE_SIZE: u32 = 10;
pub const USER_HEADER: &str = "x-yatube-user";

pub struct TestApp {
    pub repos: Arc<SqliteRepositories>,
    pub cache: Arc<FeedCache>,
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub state: HttpState,
}

impl TestApp {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_cache(pool, CacheConfig::default())
    }

    pub fn with_cache(pool: SqlitePool, config: CacheConfig) -> Self {
        let repos = Arc::new(SqliteRepositories::new(pool));
        let posts_repo: Arc<dyn PostsRepo> = repos.clone();
        let posts_write_repo: Arc<dyn PostsWriteRepo> = repos.clone();
        let users_repo: Arc<dyn UsersRepo> = repos.clone();
        let groups_repo: Arc<dyn GroupsRepo> = repos.clone();
        let comments_repo: Arc<dyn CommentsRepo> = repos.clone();
        let follows_repo: Arc<dyn FollowsRepo> = repos.clone();

        let cache = Arc::new(FeedCache::new(&config));
        let trigger = CacheTrigger::new(cache.clone());

        let feed = Arc::new(FeedService::new(
            posts_repo.clone(),
            users_repo.clone(),
            groups_repo.clone(),
            follows_repo.clone(),
            cache.clone(),
            PAGE_SIZE,
        ));
        let posts = Arc::new(PostService::new(
            posts_repo,
            posts_write_repo,
            groups_repo,
            comments_repo,
            follows_repo.clone(),
            trigger.clone(),
        ));
        let subscriptions = Arc::new(SubscriptionService::new(
            follows_repo,
            users_repo.clone(),
            trigger,
        ));

        let state = HttpState {
            feed: feed.clone(),
            posts: posts.clone(),
            subscriptions: subscriptions.clone(),
            users: users_repo,
            db: repos.clone(),
            auth: Arc::new(AuthSettings {
                user_header: USER_HEADER.to_string(),
                login_url: "/auth/login/".to_string(),
            }),
        };

        Self {
            repos,
            cache,
            feed,
            posts,
            subscriptions,
            state,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn user(&self, username: &str) -> UserRecord {
        self.repos
            .create_user(CreateUserParams {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .expect("user should be created")
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: "Test description".to_string(),
            })
            .await
            .expect("group should be created")
    }

    pub async fn post(&self, author: &UserRecord, text: &str, group: Option<&str>) -> PostRecord {
        self.posts
            .create_post(
                author,
                PostInput {
                    text: text.to_string(),
                    group_slug: group.map(str::to_string),
                    image: None,
                },
            )
            .await
            .expect("post should be created")
    }
}
