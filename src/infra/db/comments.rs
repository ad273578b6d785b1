use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::SqliteRepositories;
use super::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    author_username: String,
    text: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: row.author_username,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
     c.text, c.created_at \
     FROM comments c \
     INNER JOIN users u ON u.id = c.author_id";

#[async_trait]
impl CommentsRepo for SqliteRepositories {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let sql = format!(
            "{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY julianday(c.created_at) DESC, c.id DESC"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let CreateCommentParams {
            post_id,
            author_id,
            text,
        } = params;

        let id = Uuid::now_v7();
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, author_id, text, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let sql = format!("{COMMENT_SELECT} WHERE c.id = ?");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
