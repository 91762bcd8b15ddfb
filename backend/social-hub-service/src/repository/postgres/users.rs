use crate::error::{map_unique, Result};
use crate::models::{NewUser, ProfileUpdate, User, UserCredentials};
use crate::repository::UserRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    id: Uuid,
    username: String,
    name: String,
    bio: Option<String>,
    profile_picture: Option<String>,
    created_at: DateTime<Utc>,
    password_hash: String,
}

impl From<CredentialsRow> for UserCredentials {
    fn from(row: CredentialsRow) -> Self {
        UserCredentials {
            user: User {
                id: row.id,
                username: row.username,
                name: row.name,
                bio: row.bio,
                profile_picture: row.profile_picture,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, password_hash, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, name, bio, profile_picture, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Username is already taken"))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, bio, profile_picture, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            r#"
            SELECT id, username, name, bio, profile_picture, created_at, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserCredentials::from))
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, bio = $3, profile_picture = COALESCE($4, profile_picture)
            WHERE id = $1
            RETURNING id, username, name, bio, profile_picture, created_at
            "#,
        )
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.bio)
        .bind(&update.profile_picture)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
