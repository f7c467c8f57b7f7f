//! Feed read path
//!
//! Serves a page from the feed cache and falls back to the post store when
//! the page comes back empty.

use crate::db::{PostStore, ProfileStore};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{PageResponse, PostResponse, Profile};
use feed_cache::SharedFeedCache;
use std::sync::Arc;
use tracing::{debug, info};

pub struct FeedQueryService {
    posts: Arc<dyn PostStore>,
    profiles: Arc<dyn ProfileStore>,
    cache: SharedFeedCache,
}

impl FeedQueryService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        profiles: Arc<dyn ProfileStore>,
        cache: SharedFeedCache,
    ) -> Self {
        Self {
            posts,
            profiles,
            cache,
        }
    }

    /// Cache-first feed page.
    ///
    /// On a hit `total_elements` is the number of entries returned, not the
    /// bucket length.
    pub async fn get_optimized_feed(
        &self,
        identity_id: &str,
        page: usize,
        size: usize,
    ) -> Result<PageResponse<PostResponse>> {
        let profile = self.resolve_profile(identity_id).await?;

        let entries = self.cache.get_user_feed(profile.id, page, size).await;
        if entries.is_empty() {
            debug!(
                profile_id = profile.id,
                page,
                backend = self.cache.backend_name(),
                "Feed cache miss, querying post store"
            );
            return self.feed_from_store(&profile, page, size).await;
        }

        metrics::record_feed_request("cache");
        let total = entries.len() as u64;
        let content = entries.into_iter().map(PostResponse::from).collect();
        Ok(PageResponse::new(content, page, size, total))
    }

    /// Feed computed directly from the follow graph and the post store
    pub async fn get_feed(
        &self,
        identity_id: &str,
        page: usize,
        size: usize,
    ) -> Result<PageResponse<PostResponse>> {
        let profile = self.resolve_profile(identity_id).await?;
        self.feed_from_store(&profile, page, size).await
    }

    /// Drop the caller's feed bucket. The next read falls back to the store;
    /// nothing is backfilled.
    pub async fn warm_up_cache(&self, identity_id: &str) -> Result<()> {
        let profile = self.resolve_profile(identity_id).await?;
        self.cache.invalidate_user_feed(profile.id).await;
        info!(profile_id = profile.id, "Feed cache reset");
        Ok(())
    }

    async fn resolve_profile(&self, identity_id: &str) -> Result<Profile> {
        self.profiles
            .find_by_identity(identity_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    async fn feed_from_store(
        &self,
        profile: &Profile,
        page: usize,
        size: usize,
    ) -> Result<PageResponse<PostResponse>> {
        let mut authors = self.profiles.following_ids(profile.id).await?;
        authors.push(profile.id);
        authors.sort_unstable();
        authors.dedup();

        let offset = page
            .checked_mul(size)
            .and_then(|o| i64::try_from(o).ok())
            .ok_or_else(|| AppError::BadRequest("page out of range".to_string()))?;
        let posts = self
            .posts
            .find_posts_by_authors(&authors, size as i64, offset)
            .await?;
        let total = self.posts.count_posts_by_authors(&authors).await?;

        metrics::record_feed_request("store");
        let content = posts.into_iter().map(PostResponse::from).collect();
        Ok(PageResponse::new(content, page, size, total.max(0) as u64))
    }
}
