//! Follower lookup used by fan-out
//!
//! The social graph lives in the profile store; the cache only needs to know
//! who follows an author at the moment a post is fanned out.

use crate::{CacheResult, UserId};
use std::collections::HashSet;

/// Read access to follower edges
#[async_trait::async_trait]
pub trait SocialGraph: Send + Sync {
    /// Followers of `user_id`, or `None` when no such user exists
    async fn followers_of(&self, user_id: UserId) -> CacheResult<Option<Vec<UserId>>>;
}

/// Buckets receiving an author's post: every follower once, then the author.
pub(crate) fn recipients(author_id: UserId, followers: &[UserId]) -> Vec<UserId> {
    let mut seen = HashSet::with_capacity(followers.len() + 1);
    let mut out = Vec::with_capacity(followers.len() + 1);
    for &id in followers.iter().chain(std::iter::once(&author_id)) {
        if seen.insert(id) {
            out.push(id);
        }
    }
    out
}
