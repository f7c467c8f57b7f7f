//! In-process feed cache
//!
//! Buckets live in a sharded concurrent map. Every mutation holds the lock of
//! a single bucket only, so fan-out to different users never serializes on a
//! global lock. Buckets are kept sorted newest-first on insert; reads are a
//! plain slice.

use crate::graph::{self, SocialGraph};
use crate::{page_bounds, CacheMetrics, FeedCache, FeedEntry, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const BACKEND: &str = "memory";

pub struct InMemoryFeedCache {
    buckets: DashMap<UserId, Vec<FeedEntry>>,
    graph: Arc<dyn SocialGraph>,
    metrics: CacheMetrics,
}

impl InMemoryFeedCache {
    pub fn new(graph: Arc<dyn SocialGraph>) -> Self {
        Self {
            buckets: DashMap::new(),
            graph,
            metrics: CacheMetrics::new(BACKEND),
        }
    }

    /// Number of users with a materialized bucket
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Insert after every entry that is not older, so equal timestamps keep
    /// arrival order.
    fn insert_sorted(bucket: &mut Vec<FeedEntry>, entry: FeedEntry) {
        let at = bucket.partition_point(|e| e.created_at >= entry.created_at);
        bucket.insert(at, entry);
    }

    fn replace_in_bucket(bucket: &mut Vec<FeedEntry>, post_id: Uuid, entry: &FeedEntry) -> usize {
        let mut replaced = 0;
        let mut reordered = false;
        for slot in bucket.iter_mut().filter(|e| e.post_id == post_id) {
            reordered |= slot.created_at != entry.created_at;
            *slot = entry.clone();
            replaced += 1;
        }
        if reordered {
            bucket.sort_by(FeedEntry::feed_order);
        }
        replaced
    }
}

#[async_trait::async_trait]
impl FeedCache for InMemoryFeedCache {
    async fn add_to_follower_feeds(&self, author_id: UserId, entry: FeedEntry) {
        let followers = match self.graph.followers_of(author_id).await {
            Ok(Some(followers)) => followers,
            Ok(None) => {
                warn!(author_id, post_id = %entry.post_id, "Author not found, skipping feed fan-out");
                return;
            }
            Err(e) => {
                warn!(author_id, post_id = %entry.post_id, error = %e, "Follower lookup failed, skipping feed fan-out");
                self.metrics.record_error("add");
                return;
            }
        };

        let recipients = graph::recipients(author_id, &followers);
        for user_id in &recipients {
            let mut bucket = self.buckets.entry(*user_id).or_default();
            Self::insert_sorted(bucket.value_mut(), entry.clone());
            debug!(user_id, post_id = %entry.post_id, "Added post to feed");
        }

        self.metrics.record_op("add");
        debug!(
            author_id,
            post_id = %entry.post_id,
            recipients = recipients.len(),
            "Feed fan-out completed"
        );
    }

    async fn update_feed_entry(&self, post_id: Uuid, entry: FeedEntry) {
        let mut buckets_touched = 0;
        for mut bucket in self.buckets.iter_mut() {
            let user_id = *bucket.key();
            if Self::replace_in_bucket(bucket.value_mut(), post_id, &entry) > 0 {
                buckets_touched += 1;
                debug!(user_id, post_id = %post_id, "Updated post in feed");
            }
        }

        self.metrics.record_op("update");
        debug!(post_id = %post_id, buckets_touched, "Feed entry update completed");
    }

    async fn remove_feed_entry(&self, post_id: Uuid, user_id: UserId) {
        if let Some(mut bucket) = self.buckets.get_mut(&user_id) {
            let before = bucket.len();
            bucket.retain(|e| e.post_id != post_id);
            if bucket.len() != before {
                debug!(user_id, post_id = %post_id, "Removed post from feed");
            }
        }
        self.metrics.record_op("remove");
    }

    async fn get_user_feed(&self, user_id: UserId, page: usize, size: usize) -> Vec<FeedEntry> {
        let Some(bucket) = self.buckets.get(&user_id) else {
            debug!(user_id, "Feed bucket empty");
            self.metrics.record_read(false);
            return Vec::new();
        };

        let slice = match page_bounds(bucket.len(), page, size) {
            Some((start, end)) => bucket[start..end].to_vec(),
            None => Vec::new(),
        };
        self.metrics.record_read(!slice.is_empty());
        slice
    }

    async fn invalidate_user_feed(&self, user_id: UserId) {
        self.buckets.remove(&user_id);
        self.metrics.record_op("invalidate");
        debug!(user_id, "Invalidated feed cache");
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
