use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{CreateGroupParams, GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;

use super::SqliteRepositories;
use super::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    title: String,
    slug: String,
    description: String,
}

impl From<GroupRow> for GroupRecord {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
        }
    }
}

#[async_trait]
impl GroupsRepo for SqliteRepositories {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description FROM post_groups WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(GroupRecord::from))
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description FROM post_groups ORDER BY title, slug",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(GroupRecord::from).collect())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let CreateGroupParams {
            title,
            slug,
            description,
        } = params;

        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            INSERT INTO post_groups (id, title, slug, description)
            VALUES (?, ?, ?, ?)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(title)
        .bind(slug)
        .bind(description)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
