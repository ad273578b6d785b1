//! Follow relationships between users and authors.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::cache::CacheTrigger;
use crate::domain::entities::{FollowRecord, UserRecord};
use crate::domain::error::DomainError;
use crate::domain::follows;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("already following this author")]
    Conflict,
    #[error("{0}")]
    InvalidOperation(String),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for SubscriptionError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { .. } => SubscriptionError::Conflict,
            RepoError::Integrity { message } => SubscriptionError::InvalidOperation(message),
            RepoError::InvalidInput { .. } => SubscriptionError::NotFound { entity: "user" },
            other => SubscriptionError::Repo(other),
        }
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity } => SubscriptionError::NotFound { entity },
            other => SubscriptionError::InvalidOperation(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct SubscriptionService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
    cache: CacheTrigger,
}

impl SubscriptionService {
    pub fn new(
        follows: Arc<dyn FollowsRepo>,
        users: Arc<dyn UsersRepo>,
        cache: CacheTrigger,
    ) -> Self {
        Self {
            follows,
            users,
            cache,
        }
    }

    /// Duplicate follows are rejected by the storage constraint, not by a
    /// prior lookup.
    pub async fn follow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, SubscriptionError> {
        follows::ensure_distinct(user_id, author_id)?;

        let record = self.follows.create_follow(user_id, author_id).await?;
        self.cache.follow_created(user_id, author_id);

        info!(
            follow_id = %record.id,
            user_id = %user_id,
            author_id = %author_id,
            "Follow created"
        );
        Ok(record)
    }

    /// Returns `false` when there was nothing to remove.
    pub async fn unfollow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool, SubscriptionError> {
        let removed = self.follows.delete_follow(user_id, author_id).await?;
        if removed {
            self.cache.follow_removed(user_id, author_id);
            info!(
                user_id = %user_id,
                author_id = %author_id,
                "Follow removed"
            );
        }
        Ok(removed)
    }

    pub async fn is_following(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool, SubscriptionError> {
        Ok(self.follows.follow_exists(user_id, author_id).await?)
    }

    pub async fn follow_by_username(
        &self,
        user: &UserRecord,
        author_username: &str,
    ) -> Result<FollowRecord, SubscriptionError> {
        let author = self.require_author(author_username).await?;
        let record = self.follow(user.id, author.id).await?;
        debug!(
            label = %follows::follow_label(&user.username, &author.username),
            "Follow recorded"
        );
        Ok(record)
    }

    pub async fn unfollow_by_username(
        &self,
        user: &UserRecord,
        author_username: &str,
    ) -> Result<bool, SubscriptionError> {
        let author = self.require_author(author_username).await?;
        self.unfollow(user.id, author.id).await
    }

    async fn require_author(&self, username: &str) -> Result<UserRecord, SubscriptionError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or(SubscriptionError::NotFound { entity: "author" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_constraint_maps_to_conflict() {
        let err = SubscriptionError::from(RepoError::Duplicate {
            constraint: "unique_follow".to_string(),
        });
        assert!(matches!(err, SubscriptionError::Conflict));
    }

    #[test]
    fn check_constraint_maps_to_invalid_operation() {
        let err = SubscriptionError::from(RepoError::Integrity {
            message: "no_self_follow".to_string(),
        });
        assert!(matches!(err, SubscriptionError::InvalidOperation(_)));
    }

    #[test]
    fn self_follow_invariant_maps_to_invalid_operation() {
        let id = Uuid::now_v7();
        let err = SubscriptionError::from(
            follows::ensure_distinct(id, id).expect_err("self follow rejected"),
        );
        assert!(matches!(err, SubscriptionError::InvalidOperation(_)));
    }

    #[test]
    fn timeouts_stay_repository_errors() {
        let err = SubscriptionError::from(RepoError::Timeout);
        assert!(matches!(err, SubscriptionError::Repo(RepoError::Timeout)));
    }
}
