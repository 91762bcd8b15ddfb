use super::{upload::read_form, UserQuery};
use crate::error::{AppError, Result};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Body shared by like and share
#[derive(Debug, Deserialize)]
pub struct PostActionRequest {
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl PostActionRequest {
    fn ids(&self) -> Result<(Uuid, Uuid)> {
        match (self.post_id, self.user_id) {
            (Some(post_id), Some(user_id)) => Ok((post_id, user_id)),
            _ => Err(AppError::validation("Post ID and user ID are required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    pub post_id: Option<Uuid>,
}

/// Multipart fields: `user_id`, `content`, `privacy`, and an optional `media` file
pub async fn create_post(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse> {
    let mut form = read_form(payload, "media").await?;
    let user_id = form.uuid("user_id", "User ID and either content or media are required")?;
    let media = form.file.take();

    let post = state
        .posts
        .create_post(user_id, form.text("content"), form.text("privacy"), media)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Post created",
        "post": post,
    })))
}

pub async fn feed(state: web::Data<AppState>, query: web::Query<UserQuery>) -> Result<HttpResponse> {
    let posts = state.posts.feed(query.require()?).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn like(
    state: web::Data<AppState>,
    body: web::Json<PostActionRequest>,
) -> Result<HttpResponse> {
    let (post_id, user_id) = body.ids()?;
    state.posts.like(post_id, user_id).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Post liked" })))
}

pub async fn like_count(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    let likes = state.posts.like_count(post_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "post_id": post_id, "likes": likes })))
}

pub async fn comment(
    state: web::Data<AppState>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse> {
    let (post_id, user_id) = match (body.post_id, body.user_id) {
        (Some(post_id), Some(user_id)) => (post_id, user_id),
        _ => return Err(AppError::validation("All fields are required")),
    };
    let comment = state
        .posts
        .comment(post_id, user_id, body.content.as_deref())
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Comment added",
        "comment": comment,
    })))
}

pub async fn comments(
    state: web::Data<AppState>,
    query: web::Query<CommentsQuery>,
) -> Result<HttpResponse> {
    let post_id = query
        .post_id
        .ok_or_else(|| AppError::validation("Post ID is required"))?;
    let comments = state.posts.comments(post_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub async fn share(
    state: web::Data<AppState>,
    body: web::Json<PostActionRequest>,
) -> Result<HttpResponse> {
    let (post_id, user_id) = body.ids()?;
    let share = state.posts.share(post_id, user_id).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Post shared",
        "share_id": share.id,
    })))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/posts", web::post().to(create_post))
        .route("/api/posts", web::get().to(feed))
        .route("/api/posts/{id}/likes", web::get().to(like_count))
        .route("/api/likes", web::post().to(like))
        .route("/api/comments", web::post().to(comment))
        .route("/api/comments", web::get().to(comments))
        .route("/api/shares", web::post().to(share));
}
