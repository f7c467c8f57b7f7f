//! Integration Tests: Post write path
//!
//! Coverage:
//! - Validation of post and comment bodies
//! - Ownership checks on delete
//! - Like/unlike conflicts
//! - Which mutations publish feed events

mod common;

use common::Harness;
use event_schema::FeedEvent;
use feed_service::error::AppError;
use feed_service::models::{CreateCommentRequest, CreatePostRequest, MAX_POST_LENGTH};
use uuid::Uuid;

fn post(content: &str) -> CreatePostRequest {
    CreatePostRequest {
        content: content.to_string(),
        image_url: None,
    }
}

fn comment(content: &str) -> CreateCommentRequest {
    CreateCommentRequest {
        content: content.to_string(),
    }
}

fn queued_kinds(h: &mut Harness) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    while let Ok(envelope) = h.receiver.try_recv() {
        kinds.push(envelope.data.kind());
    }
    kinds
}

#[tokio::test]
async fn test_create_post_publishes_event() {
    let mut h = Harness::new();
    let alice = h.store.add_profile("kc-alice", "alice");

    let created = h
        .posts
        .create_post(
            "kc-alice",
            CreatePostRequest {
                content: "with picture".to_string(),
                image_url: Some("https://cdn.example.com/p.png".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.author_username, "alice");
    assert_eq!(created.image_url.as_deref(), Some("https://cdn.example.com/p.png"));
    assert_eq!(created.likes_count, 0);

    let envelope = h.receiver.try_recv().unwrap();
    assert_eq!(envelope.source, "feed-service");
    match envelope.data {
        FeedEvent::PostCreated(e) => {
            assert_eq!(e.post_id, created.id);
            assert_eq!(e.author_id, alice.id);
            assert_eq!(e.author_username, "alice");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_create_post_validation() {
    let mut h = Harness::new();
    h.store.add_profile("kc-alice", "alice");

    let err = h.posts.create_post("kc-alice", post("   ")).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let too_long = "x".repeat(MAX_POST_LENGTH + 1);
    let err = h.posts.create_post("kc-alice", post(&too_long)).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = h
        .posts
        .create_post(
            "kc-alice",
            CreatePostRequest {
                content: "bad image".to_string(),
                image_url: Some("not a url".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = h.posts.create_post("kc-ghost", post("hi")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(h.store.post_count(), 0);
    assert!(queued_kinds(&mut h).is_empty());
}

#[tokio::test]
async fn test_only_author_can_delete_post() {
    let mut h = Harness::new();
    h.store.add_profile("kc-alice", "alice");
    h.store.add_profile("kc-bob", "bob");
    let created = h.posts.create_post("kc-alice", post("mine")).await.unwrap();
    queued_kinds(&mut h);

    let err = h.posts.delete_post("kc-bob", created.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(queued_kinds(&mut h).is_empty());

    h.posts.delete_post("kc-alice", created.id).await.unwrap();
    assert_eq!(queued_kinds(&mut h), vec!["post_deleted"]);

    let err = h.posts.get_post(created.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_like_twice_conflicts_and_unlike_is_silent() {
    let mut h = Harness::new();
    h.store.add_profile("kc-alice", "alice");
    h.store.add_profile("kc-bob", "bob");
    let created = h.posts.create_post("kc-alice", post("P1")).await.unwrap();
    queued_kinds(&mut h);

    h.posts.like_post("kc-bob", created.id).await.unwrap();
    let err = h.posts.like_post("kc-bob", created.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(queued_kinds(&mut h), vec!["post_liked"]);
    assert_eq!(h.posts.get_post(created.id).await.unwrap().likes_count, 1);

    h.posts.unlike_post("kc-bob", created.id).await.unwrap();
    assert!(queued_kinds(&mut h).is_empty());
    assert_eq!(h.posts.get_post(created.id).await.unwrap().likes_count, 0);

    let err = h.posts.unlike_post("kc-bob", created.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_like_missing_post_is_not_found() {
    let h = Harness::new();
    h.store.add_profile("kc-bob", "bob");

    let err = h.posts.like_post("kc-bob", Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_comments_lifecycle() {
    let mut h = Harness::new();
    let alice = h.store.add_profile("kc-alice", "alice");
    h.store.add_profile("kc-bob", "bob");
    let created = h.posts.create_post("kc-alice", post("P1")).await.unwrap();
    queued_kinds(&mut h);

    let first = h
        .posts
        .add_comment("kc-bob", created.id, comment("nice"))
        .await
        .unwrap();
    h.posts
        .add_comment("kc-alice", created.id, comment("thanks"))
        .await
        .unwrap();
    assert_eq!(first.author_username, "bob");
    assert_eq!(first.post_id, created.id);

    let envelope = h.receiver.try_recv().unwrap();
    match envelope.data {
        FeedEvent::CommentAdded(e) => {
            assert_eq!(e.comment_id, first.id);
            assert_eq!(e.post_author_id, alice.id);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(queued_kinds(&mut h), vec!["comment_added"]);

    let page = h.posts.list_comments(created.id, 0, 10).await.unwrap();
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.content[0].content, "thanks");
    assert_eq!(h.posts.get_post(created.id).await.unwrap().comments_count, 2);

    let err = h
        .posts
        .delete_comment("kc-alice", first.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    h.posts.delete_comment("kc-bob", first.id).await.unwrap();
    assert_eq!(h.posts.get_post(created.id).await.unwrap().comments_count, 1);
    assert!(queued_kinds(&mut h).is_empty());
}

#[tokio::test]
async fn test_comment_validation_and_missing_post() {
    let h = Harness::new();
    h.store.add_profile("kc-bob", "bob");

    let err = h
        .posts
        .add_comment("kc-bob", Uuid::new_v4(), comment(""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = h
        .posts
        .add_comment("kc-bob", Uuid::new_v4(), comment("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = h.posts.list_comments(Uuid::new_v4(), 0, 10).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_user_posts_pages_newest_first() {
    let h = Harness::new();
    let alice = h.store.add_profile("kc-alice", "alice");
    let bob = h.store.add_profile("kc-bob", "bob");
    for i in 0..3 {
        h.store.seed_post(alice.id, &format!("a{}", i));
    }
    h.store.seed_post(bob.id, "b0");

    let page = h.posts.user_posts("alice", 0, 2).await.unwrap();
    let contents: Vec<_> = page.content.iter().map(|p| p.content.as_str()).collect();
    assert_eq!(contents, vec!["a2", "a1"]);
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.total_pages, 2);

    let err = h.posts.user_posts("nobody", 0, 2).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_mutations_succeed_when_queue_is_full() {
    let mut h = Harness::with_config(&feed_service::config::EventConfig {
        queue_capacity: 1,
        ..Default::default()
    });
    h.store.add_profile("kc-alice", "alice");

    for i in 0..3 {
        h.posts
            .create_post("kc-alice", post(&format!("p{}", i)))
            .await
            .unwrap();
    }
    assert_eq!(h.store.post_count(), 3);
    assert_eq!(queued_kinds(&mut h), vec!["post_created"]);
}
