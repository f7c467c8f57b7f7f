use actix_web::{delete, get, post, web, HttpResponse};

use super::HandlerState;
use crate::error::Result;
use crate::middleware::Identity;
use crate::models::{ApiResponse, PageQuery};

#[post("/{username}/follow")]
pub async fn follow_user(
    identity: Identity,
    path: web::Path<String>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    state
        .profiles
        .follow_user(identity.as_str(), &path)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Successfully followed user")))
}

#[delete("/{username}/follow")]
pub async fn unfollow_user(
    identity: Identity,
    path: web::Path<String>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    state
        .profiles
        .unfollow_user(identity.as_str(), &path)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Successfully unfollowed user")))
}

#[get("/{username}/followers")]
pub async fn get_followers(
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let (page, size) = query.resolve();
    let followers = state.profiles.followers(&path, page, size).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(followers)))
}

#[get("/{username}/following")]
pub async fn get_following(
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let (page, size) = query.resolve();
    let following = state.profiles.following(&path, page, size).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(following)))
}
