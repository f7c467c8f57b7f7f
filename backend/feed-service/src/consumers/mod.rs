pub mod feed_events;

pub use feed_events::{
    feed_event_queue, spawn_feed_event_workers, FeedEventHandler, FeedEventPublisher,
    FeedEventReceiver,
};
