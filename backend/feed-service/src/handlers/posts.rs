use actix_web::{delete, get, post, web, HttpResponse};
use uuid::Uuid;

use super::HandlerState;
use crate::error::Result;
use crate::middleware::Identity;
use crate::models::{ApiResponse, CreateCommentRequest, CreatePostRequest, PageQuery};

#[post("")]
pub async fn create_post(
    identity: Identity,
    body: web::Json<CreatePostRequest>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let post = state
        .posts
        .create_post(identity.as_str(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message("Post created successfully", post)))
}

#[get("/user/{username}")]
pub async fn get_user_posts(
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let (page, size) = query.resolve();
    let posts = state.posts.user_posts(&path, page, size).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(posts)))
}

#[delete("/comments/{comment_id}")]
pub async fn delete_comment(
    identity: Identity,
    path: web::Path<Uuid>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    state
        .posts
        .delete_comment(identity.as_str(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Comment deleted successfully")))
}

#[get("/{post_id}")]
pub async fn get_post(
    path: web::Path<Uuid>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let post = state.posts.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(post)))
}

#[delete("/{post_id}")]
pub async fn delete_post(
    identity: Identity,
    path: web::Path<Uuid>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    state
        .posts
        .delete_post(identity.as_str(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Post deleted successfully")))
}

#[post("/{post_id}/like")]
pub async fn like_post(
    identity: Identity,
    path: web::Path<Uuid>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    state
        .posts
        .like_post(identity.as_str(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Post liked successfully")))
}

#[delete("/{post_id}/like")]
pub async fn unlike_post(
    identity: Identity,
    path: web::Path<Uuid>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    state
        .posts
        .unlike_post(identity.as_str(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Post unliked successfully")))
}

#[post("/{post_id}/comments")]
pub async fn add_comment(
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CreateCommentRequest>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let comment = state
        .posts
        .add_comment(identity.as_str(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        "Comment added successfully",
        comment,
    )))
}

#[get("/{post_id}/comments")]
pub async fn get_comments(
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
    state: web::Data<HandlerState>,
) -> Result<HttpResponse> {
    let (page, size) = query.resolve();
    let comments = state
        .posts
        .list_comments(path.into_inner(), page, size)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(comments)))
}
