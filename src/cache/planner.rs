//! Invalidation planning.
//!
//! Maps a cache event onto the set of feeds whose pages must be dropped.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use super::events::EventKind;
use super::keys::ScopeKey;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub scopes: HashSet<ScopeKey>,
    pub clear_all: bool,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ scopes: {}, clear_all: {} }}",
            self.scopes.len(),
            self.clear_all
        )
    }
}

impl InvalidationPlan {
    pub fn for_event(kind: &EventKind) -> Self {
        let mut plan = Self::default();

        match kind {
            EventKind::PostCreated {
                author,
                group,
                followers,
                ..
            }
            | EventKind::PostDeleted {
                author,
                group,
                followers,
                ..
            } => {
                plan.add_post_scopes(author, [group.as_deref()], followers);
            }
            EventKind::PostUpdated {
                author,
                previous_group,
                group,
                followers,
                ..
            } => {
                plan.add_post_scopes(
                    author,
                    [previous_group.as_deref(), group.as_deref()],
                    followers,
                );
            }
            EventKind::FollowCreated { user_id, .. } | EventKind::FollowRemoved { user_id, .. } => {
                plan.scopes.insert(ScopeKey::Follow(*user_id));
            }
            EventKind::ClearAll => plan.clear_all = true,
        }

        plan
    }

    fn add_post_scopes<'a>(
        &mut self,
        author: &str,
        groups: impl IntoIterator<Item = Option<&'a str>>,
        followers: &[Uuid],
    ) {
        self.scopes.insert(ScopeKey::Index);
        self.scopes.insert(ScopeKey::Author(author.to_string()));
        for slug in groups.into_iter().flatten() {
            self.scopes.insert(ScopeKey::Group(slug.to_string()));
        }
        for follower in followers {
            self.scopes.insert(ScopeKey::Follow(*follower));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty() && !self.clear_all
    }
}
