//! Materialized feed cache
//!
//! Holds one ordered bucket of feed entries per user, filled by
//! fan-out-on-write:
//! - `FeedCache` contract shared by every backend
//! - In-process backend on a sharded concurrent map (`InMemoryFeedCache`)
//! - Redis backend with one list per user and a bucket TTL (`RedisFeedCache`)
//! - `SocialGraph` follower lookup consulted on fan-out
//!
//! Every operation is best-effort. Backend failures are logged and absorbed,
//! callers only ever observe a smaller (possibly empty) feed.

mod entry;
mod error;
mod keys;
mod metrics;

pub mod graph;
pub mod memory;
pub mod remote;

pub use entry::{page_bounds, FeedEntry};
pub use error::{CacheError, CacheResult};
pub use graph::SocialGraph;
pub use keys::{CacheKey, CACHE_VERSION};
pub use memory::InMemoryFeedCache;
pub use metrics::CacheMetrics;
pub use remote::RedisFeedCache;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Profile identifier owning a feed bucket
pub type UserId = i64;

/// Shared handle to whichever backend was selected at startup
pub type SharedFeedCache = Arc<dyn FeedCache>;

/// Default TTL values (seconds)
pub mod ttl {
    /// Remote feed bucket, refreshed on every push (24 hours)
    pub const FEED_BUCKET: u64 = 24 * 60 * 60;
}

/// Per-user feed bucket operations.
///
/// Implementations must make each bucket mutation atomic with respect to
/// other mutations of the same bucket. No cross-bucket transaction is offered.
#[async_trait::async_trait]
pub trait FeedCache: Send + Sync {
    /// Append `entry` to the bucket of the author and of every current follower
    async fn add_to_follower_feeds(&self, author_id: UserId, entry: FeedEntry);

    /// Replace every cached entry for `post_id` with `entry`, keeping its position.
    /// Buckets without the post are left untouched.
    async fn update_feed_entry(&self, post_id: Uuid, entry: FeedEntry);

    /// Drop the entry for `post_id` from the bucket owned by `user_id`
    async fn remove_feed_entry(&self, post_id: Uuid, user_id: UserId);

    /// Page `page` (0-based) of `size` entries, newest first
    async fn get_user_feed(&self, user_id: UserId, page: usize, size: usize) -> Vec<FeedEntry>;

    /// Discard the whole bucket of `user_id`
    async fn invalidate_user_feed(&self, user_id: UserId);

    /// Backend label used in logs and metrics
    fn backend_name(&self) -> &'static str;
}

/// Backend selected at process start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedCacheBackend {
    #[default]
    InMemory,
    Redis,
}

impl FromStr for FeedCacheBackend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            other => Err(CacheError::InvalidData(format!(
                "unknown feed cache backend '{}' (expected 'memory' or 'redis')",
                other
            ))),
        }
    }
}

impl fmt::Display for FeedCacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => f.write_str("memory"),
            Self::Redis => f.write_str("redis"),
        }
    }
}
