use super::ProfileStore;
use crate::error::Result;
use crate::models::{Profile, ProfileId};
use sqlx::PgPool;

const PROFILE_COLUMNS: &str = "id, identity_id, username, avatar_url, created_at";

#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a profile. Provisioning normally happens at registration; this
    /// is used for seeding and tests.
    pub async fn create_profile(
        &self,
        identity_id: &str,
        username: &str,
        avatar_url: Option<&str>,
    ) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (identity_id, username, avatar_url)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(identity_id)
        .bind(username)
        .bind(avatar_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileRepository {
    async fn find_by_identity(&self, identity_id: &str) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE identity_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_id(&self, profile_id: ProfileId) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE username = $1",
            PROFILE_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn follower_ids(&self, profile_id: ProfileId) -> Result<Vec<ProfileId>> {
        let ids = sqlx::query_scalar::<_, ProfileId>(
            "SELECT follower_id FROM follows WHERE following_id = $1 ORDER BY follower_id",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn following_ids(&self, profile_id: ProfileId) -> Result<Vec<ProfileId>> {
        let ids = sqlx::query_scalar::<_, ProfileId>(
            "SELECT following_id FROM follows WHERE follower_id = $1 ORDER BY following_id",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn find_by_ids(&self, profile_ids: &[ProfileId]) -> Result<Vec<Profile>> {
        if profile_ids.is_empty() {
            return Ok(Vec::new());
        }

        let profiles = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = ANY($1) ORDER BY id",
            PROFILE_COLUMNS
        ))
        .bind(profile_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn follow(&self, follower_id: ProfileId, following_id: ProfileId) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    async fn unfollow(&self, follower_id: ProfileId, following_id: ProfileId) -> Result<bool> {
        let deleted = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted > 0)
    }
}
