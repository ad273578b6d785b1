//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers, after names have been resolved to ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Newest first; a page past the end comes back empty with the real total.
    async fn list_posts(
        &self,
        scope: PostListScope,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError>;

    async fn find_post_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn count_posts_by_author(&self, author_id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Rewrites text, group and image; `created_at` is never touched.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Returns `true` when a row was removed.
    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Inserts without a prior existence check; the unique and check
    /// constraints reject duplicates and self-follows.
    async fn create_follow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError>;

    /// Returns `true` when a row was removed.
    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn follow_exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn list_follower_ids(&self, author_id: Uuid) -> Result<Vec<Uuid>, RepoError>;
}
