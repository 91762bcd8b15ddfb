//! HTTP surface: REST routes under `/api`, the `/ws` upgrade, health and metrics

pub mod friends;
pub mod groups;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod upload;
pub mod users;
pub mod websocket;

use crate::error::AppError;
use actix_web::{error::JsonPayloadError, error::QueryPayloadError, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// `?user_id=` on read endpoints
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<Uuid>,
}

impl UserQuery {
    pub fn require(&self) -> Result<Uuid, AppError> {
        self.user_id
            .ok_or_else(|| AppError::validation("User ID is required"))
    }
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(format!("Invalid request body: {}", err)).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(format!("Invalid query string: {}", err)).into()
}

/// Body and query extraction failures use the same `{"error": ..}` shape as every other 400
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error));
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    extractor_config(cfg);
    users::register_routes(cfg);
    posts::register_routes(cfg);
    friends::register_routes(cfg);
    groups::register_routes(cfg);
    notifications::register_routes(cfg);
    messages::register_routes(cfg);
    websocket::register_routes(cfg);
}
