/// Realtime endpoints
///
/// `GET /ws` upgrades to a channel. The channel is anonymous until the client
/// sends `join_user_room`; it receives broadcasts either way.
use crate::state::AppState;
use crate::websocket::WsSession;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde_json::json;
use uuid::Uuid;

pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let registry = state.registry.clone();
    let (channel_id, events) = registry.connect().await;
    let session = WsSession::new(channel_id, events, registry.clone(), &state.config.websocket);

    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            // handshake failed, the actor never started
            registry.leave(channel_id).await;
            tracing::warn!(%channel_id, "WebSocket handshake failed: {}", e);
            Err(e)
        }
    }
}

/// Endpoint: GET /api/ws/status/{user_id}
pub async fn ws_status(path: web::Path<Uuid>, state: web::Data<AppState>) -> HttpResponse {
    let user_id = path.into_inner();
    let channels = state.registry.channels_for(user_id).await;

    HttpResponse::Ok().json(json!({
        "user_id": user_id,
        "connected": !channels.is_empty(),
        "connection_count": channels.len(),
        "channels": channels
    }))
}

/// Endpoint: GET /api/ws/metrics
pub async fn ws_metrics(state: web::Data<AppState>) -> HttpResponse {
    let total_channels = state.registry.total_channels().await;
    let connected_users = state.registry.connected_users_count().await;

    HttpResponse::Ok().json(json!({
        "total_channels": total_channels,
        "connected_users": connected_users,
        "average_channels_per_user": if connected_users > 0 {
            total_channels as f64 / connected_users as f64
        } else {
            0.0
        }
    }))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_connect))
        .route("/api/ws/status/{user_id}", web::get().to(ws_status))
        .route("/api/ws/metrics", web::get().to(ws_metrics));
}
