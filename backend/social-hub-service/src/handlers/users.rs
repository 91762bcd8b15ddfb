use super::upload::read_form;
use crate::error::Result;
use crate::models::User;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let user = state
        .users
        .register(
            body.username.as_deref(),
            body.password.as_deref(),
            body.name.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user_id": user.id,
    })))
}

/// Returns the public profile; there is no session token
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let user: User = state
        .users
        .login(body.username.as_deref(), body.password.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn get_user(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
    let user = state.users.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Multipart fields: `user_id`, `name`, `bio`, and an optional `profile_picture` file
pub async fn update_profile(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let mut form = read_form(payload, "profile_picture").await?;
    let user_id = form.uuid("user_id", "User ID and name are required")?;
    let avatar = form.file.take();

    let user = state
        .users
        .update_profile(user_id, form.text("name"), form.text("bio"), avatar)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile updated",
        "user": user,
    })))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/register", web::post().to(register))
        .route("/api/login", web::post().to(login))
        .route("/api/users/{id}", web::get().to(get_user))
        .route("/api/profile", web::post().to(update_profile));
}

