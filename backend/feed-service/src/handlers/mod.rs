pub mod feed;
pub mod posts;
pub mod profiles;

pub use feed::{get_feed, get_optimized_feed, warm_up_feed};
pub use posts::{
    add_comment, create_post, delete_comment, delete_post, get_comments, get_post,
    get_user_posts, like_post, unlike_post,
};
pub use profiles::{follow_user, get_followers, get_following, unfollow_user};

use crate::services::{FeedQueryService, PostService, ProfileService};
use actix_web::web;
use std::sync::Arc;

/// Services shared by every request handler
pub struct HandlerState {
    pub posts: Arc<PostService>,
    pub feed: Arc<FeedQueryService>,
    pub profiles: Arc<ProfileService>,
}

/// Register the `/api/posts` routes. Literal segments come before `{post_id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_feed)
        .service(get_optimized_feed)
        .service(warm_up_feed)
        .service(create_post)
        .service(get_user_posts)
        .service(delete_comment)
        .service(get_post)
        .service(delete_post)
        .service(like_post)
        .service(unlike_post)
        .service(add_comment)
        .service(get_comments);
}

/// Register the `/api/profiles` follow routes
pub fn configure_profile_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(follow_user)
        .service(unfollow_user)
        .service(get_followers)
        .service(get_following);
}
