use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Denormalized snapshot of a post as shown in a feed.
///
/// Entries are copies taken at fan-out time and never joined against the
/// post store afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub post_id: Uuid,
    pub author_username: String,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedEntry {
    /// Newest-first ordering on creation time
    pub fn feed_order(a: &FeedEntry, b: &FeedEntry) -> Ordering {
        b.created_at.cmp(&a.created_at)
    }
}

/// Half-open slice bounds of page `page` holding `size` entries out of `len`.
///
/// `None` when the page starts at or past the end of the bucket.
pub fn page_bounds(len: usize, page: usize, size: usize) -> Option<(usize, usize)> {
    if size == 0 {
        return None;
    }
    let start = page.checked_mul(size)?;
    if start >= len {
        return None;
    }
    Some((start, start.saturating_add(size).min(len)))
}
