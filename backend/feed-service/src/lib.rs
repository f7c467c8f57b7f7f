pub mod config;
pub mod consumers;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

pub use consumers::{feed_event_queue, spawn_feed_event_workers, FeedEventPublisher};
pub use services::{FeedFanoutWriter, FeedQueryService, PostService, ProfileService};
