//! Cache trigger service.
//!
//! Write paths call into the trigger after a successful commit. The event is
//! planned and applied before the call returns, so the next read observes
//! the fresh data.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::events::EventKind;
use super::planner::InvalidationPlan;
use super::store::FeedCache;

/// Names carried by post events.
#[derive(Debug, Clone, Default)]
pub struct PostScopes {
    pub author: String,
    pub group: Option<String>,
    pub followers: Vec<Uuid>,
}

#[derive(Clone)]
pub struct CacheTrigger {
    cache: Arc<FeedCache>,
}

impl CacheTrigger {
    pub fn new(cache: Arc<FeedCache>) -> Self {
        Self { cache }
    }

    /// Plan and apply one event; returns how many pages were dropped.
    pub fn trigger(&self, kind: EventKind) -> usize {
        if !self.cache.config().is_enabled() {
            debug!(
                event_kind = kind.name(),
                "Cache trigger skipped: cache disabled"
            );
            return 0;
        }

        let plan = InvalidationPlan::for_event(&kind);
        if plan.is_empty() {
            return 0;
        }

        if plan.clear_all {
            let dropped = self.cache.len();
            self.cache.clear_all();
            info!(event_kind = kind.name(), dropped, "Cleared feed cache");
            return dropped;
        }

        let dropped: usize = plan
            .scopes
            .iter()
            .map(|scope| self.cache.invalidate_scope(scope))
            .sum();

        info!(
            event_kind = kind.name(),
            subject = ?kind.subject(),
            scopes = plan.scopes.len(),
            dropped,
            "Invalidated cached feeds"
        );
        dropped
    }

    pub fn post_created(&self, post_id: Uuid, scopes: PostScopes) -> usize {
        self.trigger(EventKind::PostCreated {
            post_id,
            author: scopes.author,
            group: scopes.group,
            followers: scopes.followers,
        })
    }

    pub fn post_updated(
        &self,
        post_id: Uuid,
        previous_group: Option<String>,
        scopes: PostScopes,
    ) -> usize {
        self.trigger(EventKind::PostUpdated {
            post_id,
            author: scopes.author,
            previous_group,
            group: scopes.group,
            followers: scopes.followers,
        })
    }

    pub fn post_deleted(&self, post_id: Uuid, scopes: PostScopes) -> usize {
        self.trigger(EventKind::PostDeleted {
            post_id,
            author: scopes.author,
            group: scopes.group,
            followers: scopes.followers,
        })
    }

    pub fn follow_created(&self, user_id: Uuid, author_id: Uuid) -> usize {
        self.trigger(EventKind::FollowCreated { user_id, author_id })
    }

    pub fn follow_removed(&self, user_id: Uuid, author_id: Uuid) -> usize {
        self.trigger(EventKind::FollowRemoved { user_id, author_id })
    }

    pub fn clear_all(&self) -> usize {
        self.trigger(EventKind::ClearAll)
    }
}
