use super::UserQuery;
use crate::error::{AppError, Result};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct JoinGroupRequest {
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

/// `user_id` invites `friend_id` into `group_id`
#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub user_id: Option<Uuid>,
    pub friend_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

pub async fn create_group(
    state: web::Data<AppState>,
    body: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse> {
    let owner_id = body
        .user_id
        .ok_or_else(|| AppError::validation("Name, description, and user_id are required"))?;
    let group = state
        .groups
        .create(owner_id, body.name.as_deref(), body.description.as_deref())
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Group created",
        "group": group,
    })))
}

pub async fn list_groups(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse> {
    let groups = state.groups.groups_for(query.require()?).await?;
    Ok(HttpResponse::Ok().json(groups))
}

pub async fn join_group(
    state: web::Data<AppState>,
    body: web::Json<JoinGroupRequest>,
) -> Result<HttpResponse> {
    let (user_id, group_id) = match (body.user_id, body.group_id) {
        (Some(user_id), Some(group_id)) => (user_id, group_id),
        _ => return Err(AppError::validation("User ID and group ID are required")),
    };
    state.groups.join(user_id, group_id).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Joined group" })))
}

pub async fn invite(
    state: web::Data<AppState>,
    body: web::Json<InviteRequest>,
) -> Result<HttpResponse> {
    let (inviter_id, invitee_id, group_id) = match (body.user_id, body.friend_id, body.group_id) {
        (Some(inviter), Some(invitee), Some(group)) => (inviter, invitee, group),
        _ => return Err(AppError::validation("All fields are required")),
    };
    state.groups.invite(inviter_id, invitee_id, group_id).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Friend invited to group" })))
}

pub async fn members(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
    let members = state.groups.members(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(members))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/groups", web::post().to(create_group))
        .route("/api/groups", web::get().to(list_groups))
        .route("/api/groups/invite", web::post().to(invite))
        .route("/api/groups/{id}/members", web::get().to(members))
        .route("/api/user_groups", web::post().to(join_group));
}
