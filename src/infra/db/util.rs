use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

/// Map SQLite failures onto repository errors by constraint kind.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => RepoError::Duplicate {
                constraint: constraint_name(db.message()),
            },
            ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation => {
                RepoError::InvalidInput {
                    message: db.message().to_string(),
                }
            }
            ErrorKind::CheckViolation => RepoError::Integrity {
                message: db.message().to_string(),
            },
            _ if db.message().contains("database is locked") => RepoError::Timeout,
            _ => RepoError::from_persistence(db.message()),
        },
        other => RepoError::from_persistence(other),
    }
}

/// SQLite reports `UNIQUE constraint failed: follows.user_id, follows.author_id`.
fn constraint_name(message: &str) -> String {
    message
        .split_once(": ")
        .map(|(_, columns)| columns.trim().to_string())
        .filter(|columns| !columns.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn convert_count(value: i64) -> Result<u64, RepoError> {
    value
        .try_into()
        .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
}
