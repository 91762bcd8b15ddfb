use super::password::{hash_password, verify_password};
use super::{media, require_user, required, MediaStore, MediaUpload};
use crate::error::{AppError, Result};
use crate::models::{NewUser, ProfileUpdate, User};
use crate::repository::UserRepository;
use std::sync::Arc;
use uuid::Uuid;

/// Accounts and profiles
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, media: Arc<dyn MediaStore>) -> Self {
        Self { users, media }
    }

    pub async fn register(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        name: Option<&str>,
    ) -> Result<User> {
        const MISSING: &str = "All fields are required";
        let username = required(username, MISSING)?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::validation(MISSING))?;
        let name = required(name, MISSING)?;

        let user = self
            .users
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: hash_password(password)?,
                name: name.to_string(),
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Unknown usernames and wrong passwords are indistinguishable to the caller
    pub async fn login(&self, username: Option<&str>, password: Option<&str>) -> Result<User> {
        const MISSING: &str = "Username and password are required";
        let username = required(username, MISSING)?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::validation(MISSING))?;

        let credentials = self
            .users
            .find_credentials(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        verify_password(password, &credentials.password_hash)?;

        tracing::info!(user_id = %credentials.user.id, "user logged in");
        Ok(credentials.user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        require_user(self.users.as_ref(), user_id, "User not found").await
    }

    /// The avatar is stored only after the input and the user have been checked
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        bio: Option<&str>,
        avatar: Option<MediaUpload>,
    ) -> Result<User> {
        let name = required(name, "User ID and name are required")?.to_string();
        require_user(self.users.as_ref(), user_id, "User not found").await?;

        let profile_picture = match avatar {
            Some(upload) => Some(self.media.store(upload).await?),
            None => None,
        };

        let stored = profile_picture.clone();
        let update = ProfileUpdate {
            name,
            bio: bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
            profile_picture,
        };
        let updated = self
            .users
            .update_profile(user_id, update)
            .await
            .and_then(|user| user.ok_or_else(|| AppError::not_found("User not found")));

        if let (Err(_), Some(url)) = (&updated, stored) {
            media::discard(self.media.as_ref(), &url).await;
        }
        updated
    }
}
