//! Post workflow: authoring, editing, deleting and commenting.
//!
//! Every successful write that changes which posts a feed shows is followed
//! by an invalidation of those feeds before the call returns.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, FollowsRepo, GroupsRepo, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::cache::{CacheTrigger, PostScopes};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::error::DomainError;
use crate::domain::posts;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("only the author may {action} this post")]
    Forbidden { action: &'static str },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for PostError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => PostError::NotFound { entity: "post" },
            RepoError::InvalidInput { message } => PostError::Validation(message),
            other => PostError::Repo(other),
        }
    }
}

impl From<DomainError> for PostError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity } => PostError::NotFound { entity },
            DomainError::NotAuthor { action } => PostError::Forbidden { action },
            DomainError::Validation { message } | DomainError::Invariant { message } => {
                PostError::Validation(message)
            }
        }
    }
}

/// Submitted post form fields.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    /// Blank or absent means the post belongs to no group.
    pub group_slug: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
    pub is_edit_allowed: bool,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    cache: CacheTrigger,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        cache: CacheTrigger,
    ) -> Self {
        Self {
            reader,
            writer,
            groups,
            comments,
            follows,
            cache,
        }
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create_post(
        &self,
        author: &UserRecord,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let text = posts::normalize_post_text(&input.text)?;
        let image = posts::normalize_image_path(input.image.as_deref())?;
        let group = self.resolve_group(input.group_slug.as_deref()).await?;

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                text,
                group_id: group.map(|group| group.id),
                image,
            })
            .await?;

        let scopes = self.post_scopes(&post).await?;
        self.cache.post_created(post.id, scopes);

        info!(
            post_id = %post.id,
            author = %post.author_username,
            label = %posts::short_label(&post.text),
            "Post created"
        );
        Ok(post)
    }

    /// The post, provided `editor` wrote it.
    pub async fn post_for_edit(
        &self,
        editor: &UserRecord,
        post_id: Uuid,
    ) -> Result<PostRecord, PostError> {
        let post = self.require_post(post_id).await?;
        ensure_author(editor, &post, "edit")?;
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        editor: &UserRecord,
        post_id: Uuid,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let existing = self.post_for_edit(editor, post_id).await?;

        let text = posts::normalize_post_text(&input.text)?;
        let image = posts::normalize_image_path(input.image.as_deref())?;
        let group = self.resolve_group(input.group_slug.as_deref()).await?;

        let updated = self
            .writer
            .update_post(UpdatePostParams {
                id: existing.id,
                text,
                group_id: group.map(|group| group.id),
                image,
            })
            .await?;

        let scopes = self.post_scopes(&updated).await?;
        self.cache
            .post_updated(updated.id, existing.group_slug.clone(), scopes);

        info!(post_id = %updated.id, author = %updated.author_username, "Post updated");
        Ok(updated)
    }

    pub async fn delete_post(&self, actor: &UserRecord, post_id: Uuid) -> Result<(), PostError> {
        let post = self.require_post(post_id).await?;
        ensure_author(actor, &post, "delete")?;

        let scopes = self.post_scopes(&post).await?;
        if !self.writer.delete_post(post.id).await? {
            return Err(PostError::NotFound { entity: "post" });
        }
        self.cache.post_deleted(post.id, scopes);

        info!(post_id = %post.id, author = %post.author_username, "Post deleted");
        Ok(())
    }

    pub async fn add_comment(
        &self,
        author: &UserRecord,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentRecord, PostError> {
        let post = self.require_post(post_id).await?;
        let text = posts::normalize_comment_text(text)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text,
            })
            .await?;

        info!(post_id = %post.id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    pub async fn post_detail(
        &self,
        post_id: Uuid,
        viewer: Option<&UserRecord>,
    ) -> Result<PostDetail, PostError> {
        let post = self.require_post(post_id).await?;
        let author_post_count = self.reader.count_posts_by_author(post.author_id).await?;
        let comments = self.comments.list_comments(post.id).await?;
        let is_edit_allowed = viewer.is_some_and(|viewer| viewer.id == post.author_id);

        Ok(PostDetail {
            post,
            author_post_count,
            comments,
            is_edit_allowed,
        })
    }

    async fn require_post(&self, post_id: Uuid) -> Result<PostRecord, PostError> {
        self.reader
            .find_post_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound { entity: "post" })
    }

    async fn resolve_group(&self, slug: Option<&str>) -> Result<Option<GroupRecord>, PostError> {
        let Some(slug) = slug.map(str::trim).filter(|slug| !slug.is_empty()) else {
            return Ok(None);
        };
        match self.groups.find_group_by_slug(slug).await? {
            Some(group) => Ok(Some(group)),
            None => Err(PostError::Validation(format!("unknown group `{slug}`"))),
        }
    }

    async fn post_scopes(&self, post: &PostRecord) -> Result<PostScopes, PostError> {
        let followers = self.follows.list_follower_ids(post.author_id).await?;
        Ok(PostScopes {
            author: post.author_username.clone(),
            group: post.group_slug.clone(),
            followers,
        })
    }
}

fn ensure_author(
    user: &UserRecord,
    post: &PostRecord,
    action: &'static str,
) -> Result<(), DomainError> {
    if user.id == post.author_id {
        Ok(())
    } else {
        Err(DomainError::not_author(action))
    }
}
