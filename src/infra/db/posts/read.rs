use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{PostListScope, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;
use crate::infra::db::util::convert_count;

use super::super::SqliteRepositories;
use super::types::{POST_ORDER, POST_SELECT, PostRow};

#[async_trait]
impl PostsRepo for SqliteRepositories {
    async fn list_posts(
        &self,
        scope: PostListScope,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_scope_conditions(&mut count_qb, scope);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        let total = convert_count(total)?;

        if page.offset() >= total {
            return Ok(Page::new(Vec::new(), page, total));
        }

        let mut qb = QueryBuilder::new(POST_SELECT);
        qb.push(" WHERE 1=1 ");
        Self::apply_scope_conditions(&mut qb, scope);
        qb.push(POST_ORDER);
        qb.push(" LIMIT ");
        qb.push_bind(to_i64(page.limit())?);
        qb.push(" OFFSET ");
        qb.push_bind(to_i64(page.offset())?);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let items = rows.into_iter().map(PostRecord::from).collect();
        Ok(Page::new(items, page, total))
    }

    async fn find_post_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("{POST_SELECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn count_posts_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }
}

fn to_i64(value: u64) -> Result<i64, RepoError> {
    i64::try_from(value).map_err(|_| RepoError::InvalidInput {
        message: format!("page window {value} exceeds supported range"),
    })
}
