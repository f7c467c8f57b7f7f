use actix_web::{get, post, web, HttpResponse};
use tracing::debug;

use super::HandlerState;
use crate::error::Result;
use crate::middleware::Identity;
use crate::models::{ApiResponse, PageQuery};

/// Feed straight from the post store
#[get("/feed")]
pub async fn get_feed(
    identity: Identity,
    query: web::Query<PageQuery>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let (page, size) = query.resolve();
    debug!(page, size, "Getting feed from store");

    let feed = state.feed.get_feed(identity.as_str(), page, size).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(feed)))
}

/// Feed served from the materialized cache, store on miss
#[get("/feed/optimized")]
pub async fn get_optimized_feed(
    identity: Identity,
    query: web::Query<PageQuery>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let (page, size) = query.resolve();
    debug!(page, size, "Getting optimized feed");

    let feed = state
        .feed
        .get_optimized_feed(identity.as_str(), page, size)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(feed)))
}

#[post("/feed/warm-up")]
pub async fn warm_up_feed(
    identity: Identity,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    state.feed.warm_up_cache(identity.as_str()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Feed cache reset")))
}
