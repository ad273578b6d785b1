//! Feed assembly: resolve a feed, consult the cache, fall back to storage.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    FollowsRepo, GroupsRepo, PostListScope, PostsRepo, RepoError, UsersRepo,
};
use crate::cache::{FeedCache, FeedKey, ScopeKey};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

/// Which feed a caller wants, by public name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    All,
    ByGroup(String),
    ByAuthor(String),
    /// Posts of every author the user follows.
    ByFollower(Uuid),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Everything the profile page shows beyond the shared layout.
#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: Page<PostRecord>,
    pub post_count: u64,
    /// `true` only for a signed-in viewer who follows the author.
    pub following: bool,
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    follows: Arc<dyn FollowsRepo>,
    cache: Arc<FeedCache>,
    page_size: u32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        follows: Arc<dyn FollowsRepo>,
        cache: Arc<FeedCache>,
        page_size: u32,
    ) -> Self {
        Self {
            posts,
            users,
            groups,
            follows,
            cache,
            page_size: page_size.max(1),
        }
    }

    pub async fn get_page(
        &self,
        scope: FeedScope,
        page: u32,
    ) -> Result<Page<PostRecord>, FeedError> {
        match scope {
            FeedScope::All => {
                self.cached_page(ScopeKey::Index, PostListScope::All, page)
                    .await
            }
            FeedScope::ByGroup(slug) => {
                let group = self.require_group(&slug).await?;
                self.cached_page(
                    ScopeKey::Group(group.slug),
                    PostListScope::Group(group.id),
                    page,
                )
                .await
            }
            FeedScope::ByAuthor(username) => {
                let author = self.require_author(&username).await?;
                self.cached_page(
                    ScopeKey::Author(author.username),
                    PostListScope::Author(author.id),
                    page,
                )
                .await
            }
            FeedScope::ByFollower(user_id) => {
                self.cached_page(
                    ScopeKey::Follow(user_id),
                    PostListScope::FollowedBy(user_id),
                    page,
                )
                .await
            }
        }
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        page: u32,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self.require_author(username).await?;
        let feed = self
            .cached_page(
                ScopeKey::Author(author.username.clone()),
                PostListScope::Author(author.id),
                page,
            )
            .await?;
        let post_count = self.posts.count_posts_by_author(author.id).await?;

        let following = match viewer {
            Some(viewer_id) if viewer_id != author.id => {
                self.follows.follow_exists(viewer_id, author.id).await?
            }
            _ => false,
        };

        Ok(ProfileFeed {
            author,
            page: feed,
            post_count,
            following,
        })
    }

    pub async fn group_page(&self, slug: &str, page: u32) -> Result<GroupFeed, FeedError> {
        let group = self.require_group(slug).await?;
        let feed = self
            .cached_page(
                ScopeKey::Group(group.slug.clone()),
                PostListScope::Group(group.id),
                page,
            )
            .await?;
        Ok(GroupFeed { group, page: feed })
    }

    async fn cached_page(
        &self,
        scope: ScopeKey,
        query: PostListScope,
        page: u32,
    ) -> Result<Page<PostRecord>, FeedError> {
        let request = PageRequest::new(page, self.page_size);
        let key = FeedKey::new(scope, request.number());

        if let Some(cached) = self.cache.get(&key) {
            debug!(key = %key, "Serving feed page from cache");
            return Ok(cached);
        }

        let ticket = self.cache.ticket(&key.scope);
        let fresh = self.posts.list_posts(query, request).await?;
        self.cache
            .fill(key, fresh.clone(), self.cache.default_ttl(), ticket);
        Ok(fresh)
    }

    async fn require_group(&self, slug: &str) -> Result<GroupRecord, FeedError> {
        self.groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(FeedError::NotFound { entity: "group" })
    }

    async fn require_author(&self, username: &str) -> Result<UserRecord, FeedError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or(FeedError::NotFound { entity: "author" })
    }
}
