//! Feed fan-out writer
//!
//! Turns post mutations into feed cache writes. Each handler reloads the
//! post from the store so the cached snapshot reflects committed state, not
//! the event payload.
//!
//! Handlers never fail: a missing post or a store error is logged and the
//! event is dropped.

use crate::db::{PostStore, ProfileStore};
use crate::error::Result;
use crate::metrics;
use event_schema::{
    CommentAddedEvent, FeedEvent, PostCreatedEvent, PostDeletedEvent, PostLikedEvent,
};
use feed_cache::SharedFeedCache;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a handler did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutOutcome {
    Applied,
    /// The post was gone by the time the event was processed
    Skipped,
}

impl FanoutOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
        }
    }
}

pub struct FeedFanoutWriter {
    posts: Arc<dyn PostStore>,
    profiles: Arc<dyn ProfileStore>,
    cache: SharedFeedCache,
}

impl FeedFanoutWriter {
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

    /// Route an event to its handler, logging instead of failing
    pub async fn handle(&self, event: &FeedEvent) {
        let kind = event.kind();
        let post_id = event.post_id();

        let result = match event {
            FeedEvent::PostCreated(e) => self.on_post_created(e).await,
            FeedEvent::PostLiked(e) => self.on_post_liked(e).await,
            FeedEvent::CommentAdded(e) => self.on_comment_added(e).await,
            FeedEvent::PostDeleted(e) => self.on_post_deleted(e).await,
        };

        match result {
            Ok(outcome) => {
                metrics::record_event(kind, outcome.as_str());
                debug!(kind, post_id = %post_id, outcome = outcome.as_str(), "Feed event handled");
            }
            Err(e) => {
                metrics::record_event(kind, "failed");
                warn!(kind, post_id = %post_id, error = %e, "Feed event handler failed");
            }
        }
    }

    pub async fn on_post_created(&self, event: &PostCreatedEvent) -> Result<FanoutOutcome> {
        info!(
            post_id = %event.post_id,
            author_id = event.author_id,
            "Handling PostCreated event - fanning out to follower feeds"
        );

        let Some(post) = self.posts.find_post(event.post_id).await? else {
            warn!(post_id = %event.post_id, "Post not found for PostCreated event");
            return Ok(FanoutOutcome::Skipped);
        };

        self.cache
            .add_to_follower_feeds(post.author_id, post.to_feed_entry())
            .await;
        Ok(FanoutOutcome::Applied)
    }

    pub async fn on_post_liked(&self, event: &PostLikedEvent) -> Result<FanoutOutcome> {
        debug!(
            post_id = %event.post_id,
            liker_id = event.liker_id,
            "Handling PostLiked event"
        );
        self.refresh_entry(event.post_id).await
    }

    pub async fn on_comment_added(&self, event: &CommentAddedEvent) -> Result<FanoutOutcome> {
        debug!(
            post_id = %event.post_id,
            comment_id = %event.comment_id,
            "Handling CommentAdded event"
        );
        self.refresh_entry(event.post_id).await
    }

    /// Remove the post from the author's bucket and from every current follower's
    pub async fn on_post_deleted(&self, event: &PostDeletedEvent) -> Result<FanoutOutcome> {
        let followers = match self.profiles.follower_ids(event.author_id).await {
            Ok(followers) => followers,
            Err(e) => {
                // still clean the author's own bucket
                warn!(
                    author_id = event.author_id,
                    error = %e,
                    "Follower lookup failed, removing post from author feed only"
                );
                Vec::new()
            }
        };

        let owners: BTreeSet<_> = followers
            .into_iter()
            .chain(std::iter::once(event.author_id))
            .collect();
        for owner in &owners {
            self.cache.remove_feed_entry(event.post_id, *owner).await;
        }

        info!(
            post_id = %event.post_id,
            buckets = owners.len(),
            "Removed deleted post from feeds"
        );
        Ok(FanoutOutcome::Applied)
    }

    async fn refresh_entry(&self, post_id: Uuid) -> Result<FanoutOutcome> {
        let Some(post) = self.posts.find_post(post_id).await? else {
            warn!(post_id = %post_id, "Post not found, skipping feed entry update");
            return Ok(FanoutOutcome::Skipped);
        };

        self.cache.update_feed_entry(post_id, post.to_feed_entry()).await;
        Ok(FanoutOutcome::Applied)
    }
}
