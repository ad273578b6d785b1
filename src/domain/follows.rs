//! Follow relationship rules.

use uuid::Uuid;

use super::error::DomainError;

/// A user may not subscribe to their own posts.
pub fn ensure_distinct(user_id: Uuid, author_id: Uuid) -> Result<(), DomainError> {
    if user_id == author_id {
        return Err(DomainError::invariant("users cannot follow themselves"));
    }
    Ok(())
}

/// `follower->author`, as shown in admin listings and logs.
pub fn follow_label(follower: &str, author: &str) -> String {
    format!("{follower}->{author}")
}
