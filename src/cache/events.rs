//! Cache events published by the write paths.

use uuid::Uuid;

/// A mutation that may make cached feed pages stale.
///
/// Post events carry the names the affected feeds are keyed by, plus the ids
/// of every follower of the author at the time of the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PostCreated {
        post_id: Uuid,
        author: String,
        group: Option<String>,
        followers: Vec<Uuid>,
    },
    /// `previous_group` is the group before the edit; both feeds are stale.
    PostUpdated {
        post_id: Uuid,
        author: String,
        previous_group: Option<String>,
        group: Option<String>,
        followers: Vec<Uuid>,
    },
    PostDeleted {
        post_id: Uuid,
        author: String,
        group: Option<String>,
        followers: Vec<Uuid>,
    },
    FollowCreated {
        user_id: Uuid,
        author_id: Uuid,
    },
    FollowRemoved {
        user_id: Uuid,
        author_id: Uuid,
    },
    ClearAll,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PostCreated { .. } => "post_created",
            EventKind::PostUpdated { .. } => "post_updated",
            EventKind::PostDeleted { .. } => "post_deleted",
            EventKind::FollowCreated { .. } => "follow_created",
            EventKind::FollowRemoved { .. } => "follow_removed",
            EventKind::ClearAll => "clear_all",
        }
    }

    /// The post or the followed author the event is about.
    pub fn subject(&self) -> Option<Uuid> {
        match self {
            EventKind::PostCreated { post_id, .. }
            | EventKind::PostUpdated { post_id, .. }
            | EventKind::PostDeleted { post_id, .. } => Some(*post_id),
            EventKind::FollowCreated { author_id, .. }
            | EventKind::FollowRemoved { author_id, .. } => Some(*author_id),
            EventKind::ClearAll => None,
        }
    }
}
