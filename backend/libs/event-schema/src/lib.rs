use chrono::{DateTime, Utc};
/// Domain events driving the feed fan-out
///
/// Payloads are versioned so producers and the fan-out worker can evolve
/// independently. Each envelope carries a required `schema_version` field.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile identifier as stored in the relational store
pub type ProfileId = i64;

/// Current schema version for all events
pub const SCHEMA_VERSION: u32 = 1;

/// Base event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique event ID for idempotency and tracing
    pub event_id: Uuid,
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Schema version for compatibility checking
    pub schema_version: u32,
    /// Component that produced the event
    pub source: String,
    /// Correlation ID for distributed tracing
    pub correlation_id: Option<Uuid>,
    pub data: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(source: impl Into<String>, data: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            schema_version: SCHEMA_VERSION,
            source: source.into(),
            correlation_id: None,
            data,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

// ============================================================================
// POST EVENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCreatedEvent {
    pub post_id: Uuid,
    pub author_id: ProfileId,
    pub author_username: String,
    pub content: String,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLikedEvent {
    pub post_id: Uuid,
    pub liker_id: ProfileId,
    pub liker_username: String,
    pub post_author_id: ProfileId,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAddedEvent {
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub commenter_id: ProfileId,
    pub commenter_username: String,
    pub content: String,
    pub post_author_id: ProfileId,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDeletedEvent {
    pub post_id: Uuid,
    pub author_id: ProfileId,
    pub occurred_on: DateTime<Utc>,
}

/// Every event the fan-out worker reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    PostCreated(PostCreatedEvent),
    PostLiked(PostLikedEvent),
    CommentAdded(CommentAddedEvent),
    PostDeleted(PostDeletedEvent),
}

impl FeedEvent {
    /// Post the event refers to
    pub fn post_id(&self) -> Uuid {
        match self {
            Self::PostCreated(e) => e.post_id,
            Self::PostLiked(e) => e.post_id,
            Self::CommentAdded(e) => e.post_id,
            Self::PostDeleted(e) => e.post_id,
        }
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PostCreated(_) => "post_created",
            Self::PostLiked(_) => "post_liked",
            Self::CommentAdded(_) => "comment_added",
            Self::PostDeleted(_) => "post_deleted",
        }
    }
}

impl From<PostCreatedEvent> for FeedEvent {
    fn from(event: PostCreatedEvent) -> Self {
        Self::PostCreated(event)
    }
}

impl From<PostLikedEvent> for FeedEvent {
    fn from(event: PostLikedEvent) -> Self {
        Self::PostLiked(event)
    }
}

impl From<CommentAddedEvent> for FeedEvent {
    fn from(event: CommentAddedEvent) -> Self {
        Self::CommentAdded(event)
    }
}

impl From<PostDeletedEvent> for FeedEvent {
    fn from(event: PostDeletedEvent) -> Self {
        Self::PostDeleted(event)
    }
}
