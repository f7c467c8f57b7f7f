use super::PostStore;
use crate::error::Result;
use crate::models::{Comment, Post, ProfileId};
use sqlx::PgPool;
use uuid::Uuid;

/// Post columns joined with the author's display fields; expects `p` and `pr` aliases
const POST_COLUMNS: &str = r#"
    p.id, p.author_id, pr.username AS author_username, pr.avatar_url AS author_avatar_url,
    p.content, p.image_url, p.likes_count, p.comments_count, p.created_at, p.updated_at
"#;

const COMMENT_COLUMNS: &str = r#"
    c.id, c.post_id, c.author_id, pr.username AS author_username,
    pr.avatar_url AS author_avatar_url, c.content, c.created_at, c.updated_at
"#;

#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PostStore for PgPostRepository {
    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {}
            FROM posts p
            JOIN profiles pr ON pr.id = p.author_id
            WHERE p.id = $1
            "#,
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn find_posts_by_authors(
        &self,
        author_ids: &[ProfileId],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {}
            FROM posts p
            JOIN profiles pr ON pr.id = p.author_id
            WHERE p.author_id = ANY($1)
            ORDER BY p.created_at DESC, p.id
            LIMIT $2 OFFSET $3
            "#,
            POST_COLUMNS
        ))
        .bind(author_ids)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn count_posts_by_authors(&self, author_ids: &[ProfileId]) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE author_id = ANY($1)",
        )
        .bind(author_ids)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn create_post(
        &self,
        author_id: ProfileId,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            WITH p AS (
                INSERT INTO posts (author_id, content, image_url)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT {}
            FROM p
            JOIN profiles pr ON pr.id = p.author_id
            "#,
            POST_COLUMNS
        ))
        .bind(author_id)
        .bind(content)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        // likes and comments go with the post (ON DELETE CASCADE)
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    async fn add_like(&self, post_id: Uuid, profile_id: ProfileId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, profile_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, profile_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(profile_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(inserted > 0)
    }

    async fn remove_like(&self, post_id: Uuid, profile_id: ProfileId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND profile_id = $2")
            .bind(post_id)
            .bind(profile_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed > 0 {
            sqlx::query(
                "UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1",
            )
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed > 0)
    }

    async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: ProfileId,
        content: &str,
    ) -> Result<Comment> {
        let mut tx = self.pool.begin().await?;

        let comment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO comments (post_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {}
            FROM comments c
            JOIN profiles pr ON pr.id = c.author_id
            WHERE c.id = $1
            "#,
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(comment)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {}
            FROM comments c
            JOIN profiles pr ON pr.id = c.author_id
            WHERE c.id = $1
            "#,
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn find_comments(&self, post_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {}
            FROM comments c
            JOIN profiles pr ON pr.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at DESC, c.id
            LIMIT $2 OFFSET $3
            "#,
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn count_comments(&self, post_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let post_id = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM comments WHERE id = $1 RETURNING post_id",
        )
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(post_id) = post_id {
            sqlx::query(
                "UPDATE posts SET comments_count = GREATEST(comments_count - 1, 0) WHERE id = $1",
            )
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(post_id.is_some())
    }
}
