//! Yatube feed cache.
//!
//! Paginated feed pages are cached per feed and page number. Every write
//! that changes which posts a feed shows goes through [`CacheTrigger`],
//! which drops all pages of the affected feeds.
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 512
//! ttl_seconds = 20
//! ```

mod config;
mod events;
mod keys;
mod lock;
mod planner;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use events::EventKind;
pub use keys::{FeedKey, ScopeKey};
pub use planner::InvalidationPlan;
pub use store::{CachedPage, FeedCache, FillTicket};
pub use trigger::{CacheTrigger, PostScopes};

pub(crate) use store::{METRIC_EVICT, METRIC_HIT, METRIC_INVALIDATED, METRIC_MISS};
