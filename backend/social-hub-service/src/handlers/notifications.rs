use super::UserQuery;
use crate::error::Result;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// Inbox for one user, newest first, with the actor's username
pub async fn list_notifications(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse> {
    let user_id = query.require()?;
    let notifications = state.repos.notifications.list_for(user_id).await?;
    tracing::debug!(user_id = %user_id, count = notifications.len(), "listed notifications");
    Ok(HttpResponse::Ok().json(notifications))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/notifications", web::get().to(list_notifications));
}
