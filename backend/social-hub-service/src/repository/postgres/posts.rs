use super::corrupt_column;
use crate::error::Result;
use crate::models::{
    Comment, CommentWithAuthor, NewComment, NewPost, PostPrivacy, PostWithAuthor, Share,
};
use crate::repository::PostRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    content: String,
    media_url: Option<String>,
    privacy: String,
    created_at: DateTime<Utc>,
    username: String,
    name: String,
    profile_picture: Option<String>,
}

impl PostRow {
    fn into_post(self) -> Result<PostWithAuthor> {
        let privacy =
            PostPrivacy::parse(&self.privacy).ok_or_else(|| corrupt_column("privacy", &self.privacy))?;
        Ok(PostWithAuthor {
            id: self.id,
            user_id: self.user_id,
            content: self.content,
            media_url: self.media_url,
            privacy,
            created_at: self.created_at,
            username: self.username,
            name: self.name,
            profile_picture: self.profile_picture,
        })
    }
}

#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create_post(&self, new_post: NewPost) -> Result<PostWithAuthor> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            WITH inserted AS (
                INSERT INTO posts (id, user_id, content, media_url, privacy)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, user_id, content, media_url, privacy, created_at
            )
            SELECT i.id, i.user_id, i.content, i.media_url, i.privacy, i.created_at,
                   u.username, u.name, u.profile_picture
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_post.user_id)
        .bind(&new_post.content)
        .bind(&new_post.media_url)
        .bind(new_post.privacy.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.into_post()
    }

    async fn find_owner(&self, post_id: Uuid) -> Result<Option<Uuid>> {
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    async fn visible_feed(&self, viewer_id: Uuid) -> Result<Vec<PostWithAuthor>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.user_id, p.content, p.media_url, p.privacy, p.created_at,
                   u.username, u.name, u.profile_picture
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.privacy = 'public'
               OR p.user_id = $1
               OR (p.privacy = 'friends' AND EXISTS (
                    SELECT 1 FROM friendships f
                    WHERE f.status = 'accepted'
                      AND ((f.requester_id = $1 AND f.target_id = p.user_id)
                        OR (f.requester_id = p.user_id AND f.target_id = $1))
               ))
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PostRow::into_post).collect()
    }

    async fn insert_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO likes (id, post_id, user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn like_count(&self, post_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn insert_comment(&self, new_comment: NewComment) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, post_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, user_id, content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_comment.post_id)
        .bind(new_comment.user_id)
        .bind(&new_comment.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn comments_for(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, u.username
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn insert_share(&self, post_id: Uuid, user_id: Uuid) -> Result<Share> {
        let share = sqlx::query_as::<_, Share>(
            r#"
            INSERT INTO shares (id, post_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, user_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(share)
    }
}
