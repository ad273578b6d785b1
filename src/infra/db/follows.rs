use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError};
use crate::domain::entities::FollowRecord;

use super::SqliteRepositories;
use super::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: Uuid,
    user_id: Uuid,
    author_id: Uuid,
    created_at: OffsetDateTime,
}

impl From<FollowRow> for FollowRecord {
    fn from(row: FollowRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            author_id: row.author_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FollowsRepo for SqliteRepositories {
    async fn create_follow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        let row = sqlx::query_as::<_, FollowRow>(
            r#"
            INSERT INTO follows (id, user_id, author_id, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, author_id, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(author_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn follow_exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists)
    }

    async fn list_follower_ids(&self, author_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT user_id FROM follows WHERE author_id = ?")
            .bind(author_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(ids)
    }
}
