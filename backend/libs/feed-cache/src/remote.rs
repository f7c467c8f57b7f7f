//! Redis feed cache
//!
//! One Redis list per user at `v1:feed:user:{id}`, newest push at the head.
//! Every push refreshes the bucket TTL. Entries are stored as JSON documents.
//!
//! Replace and remove run as Lua scripts so the scan of a bucket and the
//! write that follows see the same list even while fan-out keeps pushing.

use crate::graph::{self, SocialGraph};
use crate::{
    page_bounds, ttl, CacheError, CacheKey, CacheMetrics, CacheResult, FeedCache, FeedEntry,
    UserId,
};
use redis::aio::ConnectionManager;
use redis::Script;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const BACKEND: &str = "redis";

/// SCAN batch hint
const SCAN_COUNT: usize = 100;

/// KEYS[1] bucket, ARGV[1] post id, ARGV[2] replacement document.
/// Returns the number of replaced items.
const REPLACE_ENTRY_LUA: &str = r#"
local items = redis.call('LRANGE', KEYS[1], 0, -1)
local replaced = 0
for i, raw in ipairs(items) do
  local ok, doc = pcall(cjson.decode, raw)
  if ok and type(doc) == 'table' and doc['post_id'] == ARGV[1] then
    redis.call('LSET', KEYS[1], i - 1, ARGV[2])
    replaced = replaced + 1
  end
end
return replaced
"#;

/// KEYS[1] bucket, ARGV[1] post id. Returns the number of removed items.
const REMOVE_ENTRY_LUA: &str = r#"
local items = redis.call('LRANGE', KEYS[1], 0, -1)
local removed = 0
for _, raw in ipairs(items) do
  local ok, doc = pcall(cjson.decode, raw)
  if ok and type(doc) == 'table' and doc['post_id'] == ARGV[1] then
    removed = removed + redis.call('LREM', KEYS[1], 1, raw)
  end
end
return removed
"#;

/// Feed cache backed by Redis lists
#[derive(Clone)]
pub struct RedisFeedCache {
    conn: ConnectionManager,
    graph: Arc<dyn SocialGraph>,
    bucket_ttl_secs: u64,
    replace_script: Arc<Script>,
    remove_script: Arc<Script>,
    metrics: CacheMetrics,
}

impl RedisFeedCache {
    pub fn new(conn: ConnectionManager, graph: Arc<dyn SocialGraph>, bucket_ttl_secs: u64) -> Self {
        Self {
            conn,
            graph,
            bucket_ttl_secs,
            replace_script: Arc::new(Script::new(REPLACE_ENTRY_LUA)),
            remove_script: Arc::new(Script::new(REMOVE_ENTRY_LUA)),
            metrics: CacheMetrics::new(BACKEND),
        }
    }

    /// Open a managed connection to `redis_url`.
    ///
    /// A TTL of zero falls back to the 24 hour default.
    pub async fn connect(
        redis_url: &str,
        graph: Arc<dyn SocialGraph>,
        bucket_ttl_secs: u64,
    ) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        let ttl = if bucket_ttl_secs == 0 {
            ttl::FEED_BUCKET
        } else {
            bucket_ttl_secs
        };
        Ok(Self::new(conn, graph, ttl))
    }

    /// Round-trip PING used by readiness checks
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(CacheError::InvalidData(format!(
                "unexpected PING reply: {}",
                reply
            )));
        }
        Ok(())
    }

    async fn push(&self, user_id: UserId, document: &str) -> CacheResult<()> {
        let key = CacheKey::feed(user_id);
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(&key)
            .arg(document)
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.bucket_ttl_secs)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    /// Every feed bucket key currently present, via cursor SCAN
    async fn bucket_keys(&self) -> CacheResult<Vec<String>> {
        let pattern = CacheKey::feed_pattern();
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn replace_everywhere(&self, post_id: Uuid, entry: &FeedEntry) -> CacheResult<usize> {
        let document = serde_json::to_string(entry)?;
        let post_id = post_id.to_string();
        let mut conn = self.conn.clone();
        let mut touched = 0;

        for key in self.bucket_keys().await? {
            let replaced: i64 = self
                .replace_script
                .key(&key)
                .arg(&post_id)
                .arg(&document)
                .invoke_async(&mut conn)
                .await?;
            if replaced > 0 {
                touched += 1;
                debug!(
                    user_id = ?CacheKey::feed_owner(&key),
                    post_id = %post_id,
                    "Updated post in feed"
                );
            }
        }
        Ok(touched)
    }

    async fn remove_from_bucket(&self, post_id: Uuid, user_id: UserId) -> CacheResult<i64> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .remove_script
            .key(CacheKey::feed(user_id))
            .arg(post_id.to_string())
            .invoke_async(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn read_bucket(&self, user_id: UserId) -> CacheResult<Vec<FeedEntry>> {
        let key = CacheKey::feed(user_id);
        let mut conn = self.conn.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;

        // head of the list is the latest push; flip so ties keep arrival order
        let mut entries: Vec<FeedEntry> = raw
            .iter()
            .rev()
            .filter_map(|doc| match serde_json::from_str::<FeedEntry>(doc) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(user_id, error = %e, "Skipping undecodable feed entry");
                    None
                }
            })
            .collect();
        entries.sort_by(FeedEntry::feed_order);
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl FeedCache for RedisFeedCache {
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

        let document = match serde_json::to_string(&entry) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(post_id = %entry.post_id, error = %e, "Failed to serialize feed entry");
                self.metrics.record_error("add");
                return;
            }
        };

        let recipients = graph::recipients(author_id, &followers);
        let mut delivered = 0;
        for user_id in &recipients {
            match self.push(*user_id, &document).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(user_id, post_id = %entry.post_id, error = %e, "Failed to push post to feed");
                    self.metrics.record_error("add");
                }
            }
        }

        self.metrics.record_op("add");
        debug!(
            author_id,
            post_id = %entry.post_id,
            recipients = recipients.len(),
            delivered,
            "Feed fan-out completed"
        );
    }

    async fn update_feed_entry(&self, post_id: Uuid, entry: FeedEntry) {
        match self.replace_everywhere(post_id, &entry).await {
            Ok(buckets_touched) => {
                self.metrics.record_op("update");
                debug!(post_id = %post_id, buckets_touched, "Feed entry update completed");
            }
            Err(e) => {
                warn!(post_id = %post_id, error = %e, "Failed to update feed entry");
                self.metrics.record_error("update");
            }
        }
    }

    async fn remove_feed_entry(&self, post_id: Uuid, user_id: UserId) {
        match self.remove_from_bucket(post_id, user_id).await {
            Ok(removed) => {
                self.metrics.record_op("remove");
                if removed > 0 {
                    debug!(user_id, post_id = %post_id, "Removed post from feed");
                }
            }
            Err(e) => {
                warn!(user_id, post_id = %post_id, error = %e, "Failed to remove feed entry");
                self.metrics.record_error("remove");
            }
        }
    }

    async fn get_user_feed(&self, user_id: UserId, page: usize, size: usize) -> Vec<FeedEntry> {
        let entries = match self.read_bucket(user_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to read feed bucket");
                self.metrics.record_error("read");
                return Vec::new();
            }
        };

        let slice = match page_bounds(entries.len(), page, size) {
            Some((start, end)) => entries[start..end].to_vec(),
            None => Vec::new(),
        };
        self.metrics.record_read(!slice.is_empty());
        slice
    }

    async fn invalidate_user_feed(&self, user_id: UserId) {
        let key = CacheKey::feed(user_id);
        let mut conn = self.conn.clone();
        match redis::cmd("DEL")
            .arg(&key)
            .query_async::<_, ()>(&mut conn)
            .await
        {
            Ok(()) => {
                self.metrics.record_op("invalidate");
                debug!(user_id, "Invalidated feed cache");
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to invalidate feed cache");
                self.metrics.record_error("invalidate");
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
