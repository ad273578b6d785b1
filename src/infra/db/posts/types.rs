use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::PostRecord;

/// Shared projection: posts joined with their author and optional group.
pub(crate) const POST_SELECT: &str = "SELECT p.id, p.text, p.image, p.author_id, \
     u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, p.group_id, g.slug AS group_slug, \
     g.title AS group_title, p.created_at \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id";

/// Newest first; time-ordered ids break ties within one timestamp.
pub(crate) const POST_ORDER: &str = " ORDER BY julianday(p.created_at) DESC, p.id DESC";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: Uuid,
    pub(crate) text: String,
    pub(crate) image: Option<String>,
    pub(crate) author_id: Uuid,
    pub(crate) author_username: String,
    pub(crate) author_first_name: String,
    pub(crate) author_last_name: String,
    pub(crate) group_id: Option<Uuid>,
    pub(crate) group_slug: Option<String>,
    pub(crate) group_title: Option<String>,
    pub(crate) created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let full_name = format!(
            "{} {}",
            row.author_first_name.trim(),
            row.author_last_name.trim()
        );
        let full_name = full_name.trim();
        let author_name = if full_name.is_empty() {
            row.author_username.clone()
        } else {
            full_name.to_string()
        };

        Self {
            id: row.id,
            text: row.text,
            image: row.image,
            author_id: row.author_id,
            author_username: row.author_username,
            author_name,
            group_id: row.group_id,
            group_slug: row.group_slug,
            group_title: row.group_title,
            created_at: row.created_at,
        }
    }
}
