use crate::error::Result;
use crate::models::{Message, NewMessage};
use crate::repository::MessageRepository;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, new_message: NewMessage) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sender_id, receiver_id, content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_message.sender_id)
        .bind(new_message.receiver_id)
        .bind(&new_message.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, created_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
