//! Operator tooling: account and group creation from the CLI.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CreateGroupParams, CreateUserParams, GroupsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, UserRecord};
use crate::domain::slug::{SlugError, unique_slug, validate_slug};

const MAX_USERNAME_LEN: usize = 150;
const MAX_GROUP_TITLE_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    ConstraintViolation(String),
    #[error("`{value}` is already taken")]
    Taken { value: String },
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for AdminError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => AdminError::Taken { value: constraint },
            other => AdminError::Repo(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UsersRepo>, groups: Arc<dyn GroupsRepo>) -> Self {
        Self { users, groups }
    }

    pub async fn create_user(&self, command: CreateUserCommand) -> Result<UserRecord, AdminError> {
        let username = command.username.trim().to_string();
        validate_username(&username)?;

        if self.users.find_user_by_username(&username).await?.is_some() {
            return Err(AdminError::Taken { value: username });
        }

        let user = self
            .users
            .create_user(CreateUserParams {
                username,
                first_name: command.first_name.trim().to_string(),
                last_name: command.last_name.trim().to_string(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn create_group(
        &self,
        command: CreateGroupCommand,
    ) -> Result<GroupRecord, AdminError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(AdminError::ConstraintViolation(
                "group title must not be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_GROUP_TITLE_LEN {
            return Err(AdminError::ConstraintViolation(format!(
                "group title exceeds {MAX_GROUP_TITLE_LEN} characters"
            )));
        }

        let existing: HashSet<String> = self
            .groups
            .list_groups()
            .await?
            .into_iter()
            .map(|group| group.slug)
            .collect();

        let slug = match command.slug.map(|slug| slug.trim().to_string()) {
            Some(slug) if !slug.is_empty() => {
                validate_slug(&slug)?;
                if existing.contains(&slug) {
                    return Err(AdminError::Taken { value: slug });
                }
                slug
            }
            _ => unique_slug(&title, |candidate| existing.contains(candidate))?,
        };

        let group = self
            .groups
            .create_group(CreateGroupParams {
                title,
                slug,
                description: command.description.trim().to_string(),
            })
            .await?;

        info!(group_id = %group.id, slug = %group.slug, "Group created");
        Ok(group)
    }
}

fn validate_username(username: &str) -> Result<(), AdminError> {
    if username.is_empty() {
        return Err(AdminError::ConstraintViolation(
            "username must not be empty".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AdminError::ConstraintViolation(format!(
            "username exceeds {MAX_USERNAME_LEN} characters"
        )));
    }
    let valid = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(AdminError::ConstraintViolation(
            "username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_follow_account_rules() {
        assert!(validate_username("SteveJ").is_ok());
        assert!(validate_username("steve.j+blog@example").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("steve jobs").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn duplicate_constraint_reports_taken() {
        let err = AdminError::from(RepoError::Duplicate {
            constraint: "users.username".to_string(),
        });
        assert!(matches!(err, AdminError::Taken { .. }));
    }
}
