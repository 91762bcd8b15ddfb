use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    /// Unique handle
    pub username: String,
    /// Display name
    pub name: String,
    pub bio: Option<String>,
    /// Avatar URL returned by the media store
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Compact user row used by friend lists, suggestions and member lists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub profile_picture: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub name: String,
}

/// User together with the stored password hash; never serialized
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub bio: Option<String>,
    /// Only replaces the stored avatar when present
    pub profile_picture: Option<String>,
}
