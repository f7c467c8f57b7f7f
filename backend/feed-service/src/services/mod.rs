pub mod fanout;
pub mod feed_query;
pub mod posts;
pub mod profiles;

pub use fanout::{FanoutOutcome, FeedFanoutWriter};
pub use feed_query::FeedQueryService;
pub use posts::PostService;
pub use profiles::ProfileService;
