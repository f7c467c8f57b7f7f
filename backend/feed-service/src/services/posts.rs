//! Post write path
//!
//! Every mutation commits to the post store first and then publishes a feed
//! event. Publishing never blocks and never fails the request.

use crate::consumers::FeedEventPublisher;
use crate::db::{PostStore, ProfileStore};
use crate::error::{AppError, Result};
use crate::models::{
    CommentResponse, CreateCommentRequest, CreatePostRequest, PageResponse, PostResponse,
    Profile, MAX_COMMENT_LENGTH, MAX_POST_LENGTH,
};
use chrono::Utc;
use event_schema::{CommentAddedEvent, PostCreatedEvent, PostDeletedEvent, PostLikedEvent};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct PostService {
    posts: Arc<dyn PostStore>,
    profiles: Arc<dyn ProfileStore>,
    events: FeedEventPublisher,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        profiles: Arc<dyn ProfileStore>,
        events: FeedEventPublisher,
    ) -> Self {
        Self {
            posts,
            profiles,
            events,
        }
    }

    pub async fn create_post(
        &self,
        identity_id: &str,
        request: CreatePostRequest,
    ) -> Result<PostResponse> {
        let content = validate_text(&request.content, MAX_POST_LENGTH, "Content")?;
        let image_url = validate_image_url(request.image_url.as_deref())?;
        let author = self.resolve_profile(identity_id).await?;

        let post = self
            .posts
            .create_post(author.id, content, image_url)
            .await?;
        info!(post_id = %post.id, author_id = author.id, "Post created");

        self.events.publish(PostCreatedEvent {
            post_id: post.id,
            author_id: author.id,
            author_username: author.username,
            content: post.content.clone(),
            occurred_on: Utc::now(),
        });

        Ok(post.into())
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostResponse> {
        self.posts
            .find_post(post_id)
            .await?
            .map(PostResponse::from)
            .ok_or_else(|| post_not_found(post_id))
    }

    /// Only the author may delete a post
    pub async fn delete_post(&self, identity_id: &str, post_id: Uuid) -> Result<()> {
        let caller = self.resolve_profile(identity_id).await?;
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| post_not_found(post_id))?;

        if post.author_id != caller.id {
            return Err(AppError::Forbidden(
                "You can only delete your own posts".to_string(),
            ));
        }

        if !self.posts.delete_post(post_id).await? {
            return Err(post_not_found(post_id));
        }
        info!(post_id = %post_id, author_id = caller.id, "Post deleted");

        self.events.publish(PostDeletedEvent {
            post_id,
            author_id: post.author_id,
            occurred_on: Utc::now(),
        });
        Ok(())
    }

    pub async fn like_post(&self, identity_id: &str, post_id: Uuid) -> Result<()> {
        let liker = self.resolve_profile(identity_id).await?;
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| post_not_found(post_id))?;

        if !self.posts.add_like(post_id, liker.id).await? {
            return Err(AppError::Conflict("Post already liked".to_string()));
        }
        info!(post_id = %post_id, liker_id = liker.id, "Post liked");

        self.events.publish(PostLikedEvent {
            post_id,
            liker_id: liker.id,
            liker_username: liker.username,
            post_author_id: post.author_id,
            occurred_on: Utc::now(),
        });
        Ok(())
    }

    /// Cached like counts are not refreshed here; they catch up on the next
    /// like or comment.
    pub async fn unlike_post(&self, identity_id: &str, post_id: Uuid) -> Result<()> {
        let profile = self.resolve_profile(identity_id).await?;
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(post_not_found(post_id));
        }

        if !self.posts.remove_like(post_id, profile.id).await? {
            return Err(AppError::BadRequest("Post not liked".to_string()));
        }
        info!(post_id = %post_id, profile_id = profile.id, "Post unliked");
        Ok(())
    }

    pub async fn add_comment(
        &self,
        identity_id: &str,
        post_id: Uuid,
        request: CreateCommentRequest,
    ) -> Result<CommentResponse> {
        let content = validate_text(&request.content, MAX_COMMENT_LENGTH, "Comment")?;
        let commenter = self.resolve_profile(identity_id).await?;
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| post_not_found(post_id))?;

        let comment = self
            .posts
            .add_comment(post_id, commenter.id, content)
            .await?;
        info!(post_id = %post_id, comment_id = %comment.id, "Comment added");

        self.events.publish(CommentAddedEvent {
            comment_id: comment.id,
            post_id,
            commenter_id: commenter.id,
            commenter_username: commenter.username,
            content: comment.content.clone(),
            post_author_id: post.author_id,
            occurred_on: Utc::now(),
        });

        Ok(comment.into())
    }

    pub async fn list_comments(
        &self,
        post_id: Uuid,
        page: usize,
        size: usize,
    ) -> Result<PageResponse<CommentResponse>> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(post_not_found(post_id));
        }

        let offset = page_offset(page, size)?;
        let comments = self
            .posts
            .find_comments(post_id, size as i64, offset)
            .await?;
        let total = self.posts.count_comments(post_id).await?;

        let content = comments.into_iter().map(CommentResponse::from).collect();
        Ok(PageResponse::new(content, page, size, total.max(0) as u64))
    }

    /// Only the comment author may delete a comment
    pub async fn delete_comment(&self, identity_id: &str, comment_id: Uuid) -> Result<()> {
        let caller = self.resolve_profile(identity_id).await?;
        let comment = self
            .posts
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment not found with id: {}", comment_id)))?;

        if comment.author_id != caller.id {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.posts.delete_comment(comment_id).await?;
        info!(comment_id = %comment_id, post_id = %comment.post_id, "Comment deleted");
        Ok(())
    }

    pub async fn user_posts(
        &self,
        username: &str,
        page: usize,
        size: usize,
    ) -> Result<PageResponse<PostResponse>> {
        let author = self
            .profiles
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {}", username)))?;

        let authors = [author.id];
        let offset = page_offset(page, size)?;
        let posts = self
            .posts
            .find_posts_by_authors(&authors, size as i64, offset)
            .await?;
        let total = self.posts.count_posts_by_authors(&authors).await?;

        let content = posts.into_iter().map(PostResponse::from).collect();
        Ok(PageResponse::new(content, page, size, total.max(0) as u64))
    }

    async fn resolve_profile(&self, identity_id: &str) -> Result<Profile> {
        self.profiles
            .find_by_identity(identity_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }
}

fn post_not_found(post_id: Uuid) -> AppError {
    AppError::NotFound(format!("Post not found with id: {}", post_id))
}

fn page_offset(page: usize, size: usize) -> Result<i64> {
    page.checked_mul(size)
        .and_then(|o| i64::try_from(o).ok())
        .ok_or_else(|| AppError::BadRequest("page out of range".to_string()))
}

fn validate_text<'a>(text: &'a str, max_chars: usize, label: &str) -> Result<&'a str> {
    if text.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", label)));
    }
    if text.chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "{} must not exceed {} characters",
            label, max_chars
        )));
    }
    Ok(text)
}

/// Empty means no image. Otherwise an optional http(s) scheme and a dotted host.
fn validate_image_url(raw: Option<&str>) -> Result<Option<&str>> {
    let Some(url) = raw.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };

    let invalid = || AppError::BadRequest("Image URL must be a valid URL or empty".to_string());
    if url.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split('/').next().unwrap_or_default();
    let labels: Vec<&str> = host.split('.').collect();
    let valid_host = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });

    if valid_host {
        Ok(Some(url))
    } else {
        Err(invalid())
    }
}
