use super::corrupt_column;
use crate::error::{map_unique, Result};
use crate::models::{FriendRequestView, FriendshipEdge, FriendshipStatus, UserSummary};
use crate::repository::FriendshipRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct EdgeRow {
    id: Uuid,
    requester_id: Uuid,
    target_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl EdgeRow {
    fn into_edge(self) -> Result<FriendshipEdge> {
        let status = FriendshipStatus::parse(&self.status)
            .ok_or_else(|| corrupt_column("status", &self.status))?;
        Ok(FriendshipEdge {
            id: self.id,
            requester_id: self.requester_id,
            target_id: self.target_id,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgFriendshipRepository {
    pool: PgPool,
}

impl PgFriendshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipRepository for PgFriendshipRepository {
    async fn find_active_edge(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<FriendshipEdge>> {
        let row = sqlx::query_as::<_, EdgeRow>(
            r#"
            SELECT id, requester_id, target_id, status, created_at
            FROM friendships
            WHERE ((requester_id = $1 AND target_id = $2) OR (requester_id = $2 AND target_id = $1))
              AND status IN ('pending', 'accepted')
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EdgeRow::into_edge).transpose()
    }

    async fn create_request(&self, requester_id: Uuid, target_id: Uuid) -> Result<FriendshipEdge> {
        let row = sqlx::query_as::<_, EdgeRow>(
            r#"
            INSERT INTO friendships (id, requester_id, target_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, requester_id, target_id, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(requester_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Friend request already exists"))?;

        row.into_edge()
    }

    async fn accept_request(&self, requester_id: Uuid, target_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE friendships
            SET status = 'accepted'
            WHERE requester_id = $1 AND target_id = $2 AND status = 'pending'
            "#,
        )
        .bind(requester_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO friendships (id, requester_id, target_id, status)
            VALUES ($1, $2, $3, 'accepted')
            ON CONFLICT (requester_id, target_id) DO UPDATE
            SET status = 'accepted'
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(target_id)
        .bind(requester_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_pending(&self, request_id: Uuid) -> Result<Option<FriendshipEdge>> {
        let row = sqlx::query_as::<_, EdgeRow>(
            r#"
            DELETE FROM friendships
            WHERE id = $1 AND status = 'pending'
            RETURNING id, requester_id, target_id, status, created_at
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EdgeRow::into_edge).transpose()
    }

    async fn pending_for(&self, target_id: Uuid) -> Result<Vec<FriendRequestView>> {
        let requests = sqlx::query_as::<_, FriendRequestView>(
            r#"
            SELECT f.id, f.requester_id AS from_user_id, u.username, u.name
            FROM friendships f
            JOIN users u ON u.id = f.requester_id
            WHERE f.target_id = $1 AND f.status = 'pending'
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(target_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn friends_of(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        // UNION collapses the two directions of each accepted pair
        let friends = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.name, u.profile_picture
            FROM friendships f
            JOIN users u ON u.id = f.target_id
            WHERE f.requester_id = $1 AND f.status = 'accepted'
            UNION
            SELECT u.id, u.username, u.name, u.profile_picture
            FROM friendships f
            JOIN users u ON u.id = f.requester_id
            WHERE f.target_id = $1 AND f.status = 'accepted'
            ORDER BY name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }

    async fn suggestions(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.name, u.profile_picture
            FROM users u
            WHERE u.id <> $1
              AND NOT EXISTS (
                SELECT 1 FROM friendships f
                WHERE f.status IN ('pending', 'accepted')
                  AND ((f.requester_id = $1 AND f.target_id = u.id)
                    OR (f.requester_id = u.id AND f.target_id = $1))
              )
            ORDER BY u.username ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
