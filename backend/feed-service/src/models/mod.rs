use chrono::{DateTime, Utc};
use feed_cache::FeedEntry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile identifier; also the owner id of a feed bucket
pub type ProfileId = feed_cache::UserId;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;

// ============================================================================
// STORE ROWS
// ============================================================================

/// A user profile, keyed internally by `id` and externally by `identity_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: ProfileId,
    pub identity_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A post joined with its author's display fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: ProfileId,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Snapshot the post for the feed cache
    pub fn to_feed_entry(&self) -> FeedEntry {
        FeedEntry {
            post_id: self.id,
            author_username: self.author_username.clone(),
            author_avatar_url: self.author_avatar_url.clone(),
            content: self.content.clone(),
            image_url: self.image_url.clone(),
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A comment joined with its author's display fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: ProfileId,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// `?page=&size=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl PageQuery {
    /// 0-based page and a size clamped to `1..=MAX_PAGE_SIZE`
    pub fn resolve(&self) -> (usize, usize) {
        let size = self
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (self.page.unwrap_or(0), size)
    }
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author_username: post.author_username,
            author_avatar_url: post.author_avatar_url,
            content: post.content,
            image_url: post.image_url,
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<FeedEntry> for PostResponse {
    fn from(entry: FeedEntry) -> Self {
        Self {
            id: entry.post_id,
            author_username: entry.author_username,
            author_avatar_url: entry.author_avatar_url,
            content: entry.content,
            image_url: entry.image_url,
            likes_count: entry.likes_count,
            comments_count: entry.comments_count,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            author_username: comment.author_username,
            author_avatar_url: comment.author_avatar_url,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// Public view of a profile in follower and following listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: ProfileId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            avatar_url: profile.avatar_url,
            created_at: profile.created_at,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    pub fn new(content: Vec<T>, page: usize, size: usize, total_elements: u64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size as u64)
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}

/// Standard JSON envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}
