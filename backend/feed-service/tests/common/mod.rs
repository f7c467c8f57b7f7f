//! Shared fixtures for feed-service integration tests
//!
//! `MemoryStore` implements both store traits over plain collections so the
//! services can run without Postgres. Post timestamps come from a fake clock
//! that advances one minute per post, which keeps feed order deterministic.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use feed_cache::{FeedCache, InMemoryFeedCache, SharedFeedCache};
use feed_service::config::EventConfig;
use feed_service::consumers::FeedEventReceiver;
use feed_service::db::{PostStore, ProfileGraph, ProfileStore};
use feed_service::error::{AppError, Result};
use feed_service::handlers::HandlerState;
use feed_service::models::{Comment, Post, Profile, ProfileId};
use feed_service::{
    feed_event_queue, FeedFanoutWriter, FeedQueryService, PostService, ProfileService,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
struct PostRow {
    id: Uuid,
    author_id: ProfileId,
    content: String,
    image_url: Option<String>,
    likes_count: i32,
    comments_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: ProfileId,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    follows: BTreeSet<(ProfileId, ProfileId)>,
    posts: HashMap<Uuid, PostRow>,
    likes: HashSet<(Uuid, ProfileId)>,
    comments: HashMap<Uuid, CommentRow>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    clock: AtomicI64,
    unavailable: AtomicBool,
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every store call fail with a database error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn add_profile(&self, identity_id: &str, username: &str) -> Profile {
        let mut tables = self.tables.lock().unwrap();
        let profile = Profile {
            id: tables.profiles.len() as ProfileId + 1,
            identity_id: identity_id.to_string(),
            username: username.to_string(),
            avatar_url: Some(format!("avatars/{}.png", username)),
            created_at: epoch(),
        };
        tables.profiles.push(profile.clone());
        profile
    }

    /// Seed a follow edge without going through the service
    pub fn follow(&self, follower_id: ProfileId, following_id: ProfileId) {
        self.tables
            .lock()
            .unwrap()
            .follows
            .insert((follower_id, following_id));
    }

    /// Insert a post straight into the store, bypassing events
    pub fn seed_post(&self, author_id: ProfileId, content: &str) -> Uuid {
        let created_at = self.tick();
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().posts.insert(
            id,
            PostRow {
                id,
                author_id,
                content: content.to_string(),
                image_url: None,
                likes_count: 0,
                comments_count: 0,
                created_at,
                updated_at: created_at,
            },
        );
        id
    }

    pub fn post_count(&self) -> usize {
        self.tables.lock().unwrap().posts.len()
    }

    fn tick(&self) -> DateTime<Utc> {
        epoch() + Duration::minutes(self.clock.fetch_add(1, Ordering::SeqCst))
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database("connection refused".to_string()));
        }
        Ok(())
    }

    fn join_post(tables: &Tables, row: &PostRow) -> Post {
        let author = tables.profiles.iter().find(|p| p.id == row.author_id);
        Post {
            id: row.id,
            author_id: row.author_id,
            author_username: author.map(|a| a.username.clone()).unwrap_or_default(),
            author_avatar_url: author.and_then(|a| a.avatar_url.clone()),
            content: row.content.clone(),
            image_url: row.image_url.clone(),
            likes_count: row.likes_count,
            comments_count: row.comments_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn join_comment(tables: &Tables, row: &CommentRow) -> Comment {
        let author = tables.profiles.iter().find(|p| p.id == row.author_id);
        Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: author.map(|a| a.username.clone()).unwrap_or_default(),
            author_avatar_url: author.and_then(|a| a.avatar_url.clone()),
            content: row.content.clone(),
            created_at: row.created_at,
            updated_at: row.created_at,
        }
    }

    fn authored_by(tables: &Tables, author_ids: &[ProfileId]) -> Vec<Post> {
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| author_ids.contains(&p.author_id))
            .map(|p| Self::join_post(tables, p))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        posts
    }
}

fn window<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait::async_trait]
impl PostStore for MemoryStore {
    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.posts.get(&post_id).map(|p| Self::join_post(&tables, p)))
    }

    async fn find_posts_by_authors(
        &self,
        author_ids: &[ProfileId],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(window(Self::authored_by(&tables, author_ids), limit, offset))
    }

    async fn count_posts_by_authors(&self, author_ids: &[ProfileId]) -> Result<i64> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .posts
            .values()
            .filter(|p| author_ids.contains(&p.author_id))
            .count() as i64)
    }

    async fn create_post(
        &self,
        author_id: ProfileId,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<Post> {
        self.check()?;
        let created_at = self.tick();
        let mut tables = self.tables.lock().unwrap();
        let row = PostRow {
            id: Uuid::new_v4(),
            author_id,
            content: content.to_string(),
            image_url: image_url.map(str::to_string),
            likes_count: 0,
            comments_count: 0,
            created_at,
            updated_at: created_at,
        };
        tables.posts.insert(row.id, row.clone());
        Ok(Self::join_post(&tables, &row))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let existed = tables.posts.remove(&post_id).is_some();
        tables.likes.retain(|(p, _)| *p != post_id);
        tables.comments.retain(|_, c| c.post_id != post_id);
        Ok(existed)
    }

    async fn add_like(&self, post_id: Uuid, profile_id: ProfileId) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.likes.insert((post_id, profile_id)) {
            return Ok(false);
        }
        if let Some(post) = tables.posts.get_mut(&post_id) {
            post.likes_count += 1;
        }
        Ok(true)
    }

    async fn remove_like(&self, post_id: Uuid, profile_id: ProfileId) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.likes.remove(&(post_id, profile_id)) {
            return Ok(false);
        }
        if let Some(post) = tables.posts.get_mut(&post_id) {
            post.likes_count = (post.likes_count - 1).max(0);
        }
        Ok(true)
    }

    async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: ProfileId,
        content: &str,
    ) -> Result<Comment> {
        self.check()?;
        let created_at = self.tick();
        let mut tables = self.tables.lock().unwrap();
        let row = CommentRow {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content: content.to_string(),
            created_at,
        };
        tables.comments.insert(row.id, row.clone());
        if let Some(post) = tables.posts.get_mut(&post_id) {
            post.comments_count += 1;
        }
        Ok(Self::join_comment(&tables, &row))
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .comments
            .get(&comment_id)
            .map(|c| Self::join_comment(&tables, c)))
    }

    async fn find_comments(&self, post_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Comment>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| Self::join_comment(&tables, c))
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(window(comments, limit, offset))
    }

    async fn count_comments(&self, post_id: Uuid) -> Result<i64> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.comments.values().filter(|c| c.post_id == post_id).count() as i64)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(row) = tables.comments.remove(&comment_id) else {
            return Ok(false);
        };
        if let Some(post) = tables.posts.get_mut(&row.post_id) {
            post.comments_count = (post.comments_count - 1).max(0);
        }
        Ok(true)
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryStore {
    async fn find_by_identity(&self, identity_id: &str) -> Result<Option<Profile>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.identity_id == identity_id)
            .cloned())
    }

    async fn find_by_id(&self, profile_id: ProfileId) -> Result<Option<Profile>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.profiles.iter().find(|p| p.id == profile_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn follower_ids(&self, profile_id: ProfileId) -> Result<Vec<ProfileId>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .follows
            .iter()
            .filter(|(_, following)| *following == profile_id)
            .map(|(follower, _)| *follower)
            .collect())
    }

    async fn following_ids(&self, profile_id: ProfileId) -> Result<Vec<ProfileId>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .follows
            .iter()
            .filter(|(follower, _)| *follower == profile_id)
            .map(|(_, following)| *following)
            .collect())
    }

    async fn find_by_ids(&self, profile_ids: &[ProfileId]) -> Result<Vec<Profile>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .filter(|p| profile_ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn follow(&self, follower_id: ProfileId, following_id: ProfileId) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.follows.insert((follower_id, following_id)))
    }

    async fn unfollow(&self, follower_id: ProfileId, following_id: ProfileId) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.follows.remove(&(follower_id, following_id)))
    }
}

/// Services wired over one `MemoryStore` and an in-process cache.
///
/// Events stay in the queue until `drain_events` runs them, so tests decide
/// when fan-out happens.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<InMemoryFeedCache>,
    pub writer: Arc<FeedFanoutWriter>,
    pub posts: Arc<PostService>,
    pub feed: Arc<FeedQueryService>,
    pub profiles: Arc<ProfileService>,
    pub receiver: FeedEventReceiver,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&EventConfig::default())
    }

    pub fn with_config(events: &EventConfig) -> Self {
        let store = MemoryStore::new();
        let post_store: Arc<dyn PostStore> = store.clone();
        let profile_store: Arc<dyn ProfileStore> = store.clone();

        let graph = Arc::new(ProfileGraph::new(Arc::clone(&profile_store)));
        let cache = Arc::new(InMemoryFeedCache::new(graph));
        let shared: SharedFeedCache = cache.clone();

        let (publisher, receiver) = feed_event_queue(events.queue_capacity);
        let writer = Arc::new(FeedFanoutWriter::new(
            Arc::clone(&post_store),
            Arc::clone(&profile_store),
            Arc::clone(&shared),
        ));

        Self {
            posts: Arc::new(PostService::new(
                Arc::clone(&post_store),
                Arc::clone(&profile_store),
                publisher,
            )),
            feed: Arc::new(FeedQueryService::new(
                post_store,
                Arc::clone(&profile_store),
                shared,
            )),
            profiles: Arc::new(ProfileService::new(profile_store)),
            store,
            cache,
            writer,
            receiver,
        }
    }

    pub fn handler_state(&self) -> HandlerState {
        HandlerState {
            posts: Arc::clone(&self.posts),
            feed: Arc::clone(&self.feed),
            profiles: Arc::clone(&self.profiles),
        }
    }

    /// Run every queued event through the fan-out writer, in order
    pub async fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(envelope) = self.receiver.try_recv() {
            self.writer.handle(&envelope.data).await;
            handled += 1;
        }
        handled
    }

    /// Post ids in a user's cached bucket, newest first
    pub async fn cached_ids(&self, profile_id: ProfileId) -> Vec<Uuid> {
        self.cache
            .get_user_feed(profile_id, 0, 10_000)
            .await
            .into_iter()
            .map(|e| e.post_id)
            .collect()
    }
}
