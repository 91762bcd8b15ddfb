use super::UserQuery;
use crate::error::{AppError, Result};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// `user_id` is the acting user, `friend_id` the other party
#[derive(Debug, Deserialize)]
pub struct FriendPairRequest {
    pub user_id: Option<Uuid>,
    pub friend_id: Option<Uuid>,
}

impl FriendPairRequest {
    fn ids(&self) -> Result<(Uuid, Uuid)> {
        match (self.user_id, self.friend_id) {
            (Some(user_id), Some(friend_id)) => Ok((user_id, friend_id)),
            _ => Err(AppError::validation("Invalid user or friend ID")),
        }
    }
}

pub async fn send_request(
    state: web::Data<AppState>,
    body: web::Json<FriendPairRequest>,
) -> Result<HttpResponse> {
    let (user_id, friend_id) = body.ids()?;
    let outcome = state.friendships.send_request(user_id, friend_id).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Friend request sent",
        "request_id": outcome.request.id,
        "auto_accepted": outcome.auto_accepted,
    })))
}

pub async fn pending_requests(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse> {
    let requests = state.friendships.pending_requests(query.require()?).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// `user_id` accepts the request `friend_id` sent earlier
pub async fn accept_request(
    state: web::Data<AppState>,
    body: web::Json<FriendPairRequest>,
) -> Result<HttpResponse> {
    let (user_id, friend_id) = body.ids()?;
    state.friendships.accept(user_id, friend_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Friend request accepted" })))
}

pub async fn reject_request(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.friendships.reject(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Friend request rejected" })))
}

pub async fn friends(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse> {
    let friends = state.friendships.friends(query.require()?).await?;
    Ok(HttpResponse::Ok().json(friends))
}

pub async fn suggestions(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse> {
    let suggestions = state.friendships.suggestions(query.require()?).await?;
    Ok(HttpResponse::Ok().json(suggestions))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/friend_requests", web::post().to(send_request))
        .route("/api/friend_requests", web::get().to(pending_requests))
        .route("/api/friend_requests/accept", web::post().to(accept_request))
        .route("/api/friend_requests/{id}", web::delete().to(reject_request))
        .route("/api/friends", web::get().to(friends))
        .route("/api/suggestions", web::get().to(suggestions));
}
