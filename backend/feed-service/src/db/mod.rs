//! Durable stores behind the feed services
//!
//! Services only see the `PostStore` / `ProfileStore` traits. Postgres
//! implementations live in the submodules.

pub mod post_repo;
pub mod profile_repo;

pub use post_repo::PgPostRepository;
pub use profile_repo::PgProfileRepository;

use crate::error::Result;
use crate::models::{Comment, Post, Profile, ProfileId};
use feed_cache::{CacheError, CacheResult, SocialGraph};
use std::sync::Arc;
use uuid::Uuid;

/// Posts, likes and comments
#[async_trait::async_trait]
pub trait PostStore: Send + Sync {
    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Posts authored by any of `author_ids`, newest first
    async fn find_posts_by_authors(
        &self,
        author_ids: &[ProfileId],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>>;

    async fn count_posts_by_authors(&self, author_ids: &[ProfileId]) -> Result<i64>;

    async fn create_post(
        &self,
        author_id: ProfileId,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<Post>;

    /// Returns false when no such post existed
    async fn delete_post(&self, post_id: Uuid) -> Result<bool>;

    /// Record a like and bump the counter. False if the like already existed.
    async fn add_like(&self, post_id: Uuid, profile_id: ProfileId) -> Result<bool>;

    /// Drop a like and decrement the counter. False if there was none.
    async fn remove_like(&self, post_id: Uuid, profile_id: ProfileId) -> Result<bool>;

    /// Insert a comment and bump the post's comment counter
    async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: ProfileId,
        content: &str,
    ) -> Result<Comment>;

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;

    /// Comments on a post, newest first
    async fn find_comments(&self, post_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Comment>>;

    async fn count_comments(&self, post_id: Uuid) -> Result<i64>;

    /// Delete a comment and decrement the post's comment counter
    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool>;
}

/// Profiles and follow edges
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_identity(&self, identity_id: &str) -> Result<Option<Profile>>;

    async fn find_by_id(&self, profile_id: ProfileId) -> Result<Option<Profile>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>>;

    /// Profiles following `profile_id`
    async fn follower_ids(&self, profile_id: ProfileId) -> Result<Vec<ProfileId>>;

    /// Profiles that `profile_id` follows
    async fn following_ids(&self, profile_id: ProfileId) -> Result<Vec<ProfileId>>;

    /// Profiles for the given ids, ordered by id. Unknown ids are skipped.
    async fn find_by_ids(&self, profile_ids: &[ProfileId]) -> Result<Vec<Profile>>;

    /// Insert a follow edge. False if the edge already existed.
    async fn follow(&self, follower_id: ProfileId, following_id: ProfileId) -> Result<bool>;

    /// Drop a follow edge. False if there was none.
    async fn unfollow(&self, follower_id: ProfileId, following_id: ProfileId) -> Result<bool>;
}

/// Follower lookup for the feed cache, answered by a profile store
pub struct ProfileGraph {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileGraph {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }
}

#[async_trait::async_trait]
impl SocialGraph for ProfileGraph {
    async fn followers_of(&self, user_id: ProfileId) -> CacheResult<Option<Vec<ProfileId>>> {
        let graph_err = |e: crate::error::AppError| CacheError::Graph(e.to_string());

        if self
            .profiles
            .find_by_id(user_id)
            .await
            .map_err(graph_err)?
            .is_none()
        {
            return Ok(None);
        }
        let followers = self
            .profiles
            .follower_ids(user_id)
            .await
            .map_err(graph_err)?;
        Ok(Some(followers))
    }
}
