use crate::error::{AppError, Result};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub user_id: Option<Uuid>,
    pub friend_id: Option<Uuid>,
}

pub async fn send_message(
    state: web::Data<AppState>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    let (sender_id, receiver_id) = match (body.sender_id, body.receiver_id) {
        (Some(sender), Some(receiver)) => (sender, receiver),
        _ => {
            return Err(AppError::validation(
                "Sender ID, receiver ID, and content are required",
            ))
        }
    };
    let message = state
        .messaging
        .send(sender_id, receiver_id, body.content.as_deref())
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Message sent",
        "data": message,
    })))
}

pub async fn conversation(
    state: web::Data<AppState>,
    query: web::Query<ConversationQuery>,
) -> Result<HttpResponse> {
    let (user_id, friend_id) = match (query.user_id, query.friend_id) {
        (Some(user), Some(friend)) => (user, friend),
        _ => return Err(AppError::validation("User ID and friend ID are required")),
    };
    let messages = state.messaging.conversation(user_id, friend_id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/messages", web::post().to(send_message))
        .route("/api/messages", web::get().to(conversation));
}
