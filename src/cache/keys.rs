//! Cache key definitions.
//!
//! Every cached page is addressed by the feed it belongs to (`ScopeKey`) and
//! its page number. Invalidation works on whole scopes so that every page of
//! an affected feed is dropped together.

use std::fmt;

use uuid::Uuid;

/// Identifies one feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// The global feed on the home page.
    Index,
    /// Posts of one group, by slug.
    Group(String),
    /// Posts of one author, by username.
    Author(String),
    /// Posts of every author one user follows, by follower id.
    Follow(Uuid),
}

impl ScopeKey {
    /// Short, stable name of the scope kind for metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ScopeKey::Index => "index",
            ScopeKey::Group(_) => "group",
            ScopeKey::Author(_) => "author",
            ScopeKey::Follow(_) => "follow",
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Index => f.write_str("index"),
            ScopeKey::Group(slug) => write!(f, "{slug}-posts"),
            ScopeKey::Author(username) => write!(f, "author-{username}"),
            ScopeKey::Follow(user_id) => write!(f, "follows-{user_id}"),
        }
    }
}

/// One cached page of one feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub scope: ScopeKey,
    pub page: u32,
}

impl FeedKey {
    pub fn new(scope: ScopeKey, page: u32) -> Self {
        Self {
            scope,
            page: page.max(1),
        }
    }

    pub fn index(page: u32) -> Self {
        Self::new(ScopeKey::Index, page)
    }

    pub fn group(slug: impl Into<String>, page: u32) -> Self {
        Self::new(ScopeKey::Group(slug.into()), page)
    }

    pub fn author(username: impl Into<String>, page: u32) -> Self {
        Self::new(ScopeKey::Author(username.into()), page)
    }

    pub fn follow(user_id: Uuid, page: u32) -> Self {
        Self::new(ScopeKey::Follow(user_id), page)
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.page)
    }
}
