use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use super::super::SqliteRepositories;
use super::types::{POST_SELECT, PostRow};

#[async_trait]
impl PostsWriteRepo for SqliteRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            author_id,
            text,
            group_id,
            image,
        } = params;

        let id = Uuid::now_v7();
        let now = OffsetDateTime::now_utc();

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, text, image, author_id, group_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(text)
        .bind(image)
        .bind(author_id)
        .bind(group_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let sql = format!("{POST_SELECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            text,
            group_id,
            image,
        } = params;

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            "UPDATE posts SET text = ?, group_id = ?, image = ? WHERE id = ?",
        )
        .bind(text)
        .bind(group_id)
        .bind(image)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        let sql = format!("{POST_SELECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
