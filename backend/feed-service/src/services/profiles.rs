//! Follow graph writes and listings
//!
//! Follow edges only steer future fan-out. Following someone does not
//! backfill their existing posts into the follower's cached feed.

use crate::db::ProfileStore;
use crate::error::{AppError, Result};
use crate::models::{PageResponse, Profile, ProfileId, ProfileResponse};
use std::sync::Arc;
use tracing::info;

pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Make the caller follow `username`
    pub async fn follow_user(&self, identity_id: &str, username: &str) -> Result<()> {
        let follower = self.resolve_caller(identity_id).await?;
        let target = self
            .profiles
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User to follow not found: {}", username)))?;

        if follower.id == target.id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        if !self.profiles.follow(follower.id, target.id).await? {
            return Err(AppError::Conflict("Already following this user".to_string()));
        }
        info!(follower_id = follower.id, following_id = target.id, "Profile followed");
        Ok(())
    }

    pub async fn unfollow_user(&self, identity_id: &str, username: &str) -> Result<()> {
        let follower = self.resolve_caller(identity_id).await?;
        let target = self
            .profiles
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("User to unfollow not found: {}", username))
            })?;

        if !self.profiles.unfollow(follower.id, target.id).await? {
            return Err(AppError::BadRequest("Not following this user".to_string()));
        }
        info!(follower_id = follower.id, following_id = target.id, "Profile unfollowed");
        Ok(())
    }

    /// Profiles following `username`, ordered by profile id
    pub async fn followers(
        &self,
        username: &str,
        page: usize,
        size: usize,
    ) -> Result<PageResponse<ProfileResponse>> {
        let profile = self.resolve_username(username).await?;
        let ids = self.profiles.follower_ids(profile.id).await?;
        self.listing(ids, page, size).await
    }

    /// Profiles `username` follows, ordered by profile id
    pub async fn following(
        &self,
        username: &str,
        page: usize,
        size: usize,
    ) -> Result<PageResponse<ProfileResponse>> {
        let profile = self.resolve_username(username).await?;
        let ids = self.profiles.following_ids(profile.id).await?;
        self.listing(ids, page, size).await
    }

    async fn listing(
        &self,
        mut ids: Vec<ProfileId>,
        page: usize,
        size: usize,
    ) -> Result<PageResponse<ProfileResponse>> {
        ids.sort_unstable();
        let total = ids.len() as u64;
        let window: Vec<ProfileId> = ids
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();

        let content = self
            .profiles
            .find_by_ids(&window)
            .await?
            .into_iter()
            .map(ProfileResponse::from)
            .collect();
        Ok(PageResponse::new(content, page, size, total))
    }

    async fn resolve_caller(&self, identity_id: &str) -> Result<Profile> {
        self.profiles
            .find_by_identity(identity_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Follower profile not found".to_string()))
    }

    async fn resolve_username(&self, username: &str) -> Result<Profile> {
        self.profiles
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Profile not found with username: {}", username))
            })
    }
}
