use super::corrupt_column;
use crate::error::Result;
use crate::models::{
    NewNotification, Notification, NotificationKind, NotificationSubject, NotificationView,
};
use crate::repository::NotificationRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    actor_id: Uuid,
    kind: String,
    message: String,
    post_id: Option<Uuid>,
    group_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification> {
        let kind =
            NotificationKind::parse(&self.kind).ok_or_else(|| corrupt_column("kind", &self.kind))?;
        Ok(Notification {
            id: self.id,
            recipient_id: self.recipient_id,
            actor_id: self.actor_id,
            kind,
            message: self.message,
            post_id: self.post_id,
            group_id: self.group_id,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ViewRow {
    #[sqlx(flatten)]
    notification: NotificationRow,
    actor_username: String,
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, new_notification: NewNotification) -> Result<Notification> {
        let subject = new_notification.subject;
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, recipient_id, actor_id, kind, message, post_id, group_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, recipient_id, actor_id, kind, message, post_id, group_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_notification.recipient_id)
        .bind(new_notification.actor_id)
        .bind(new_notification.kind.as_str())
        .bind(&new_notification.message)
        .bind(subject.and_then(|s| s.post_id()))
        .bind(subject.and_then(|s| s.group_id()))
        .fetch_one(&self.pool)
        .await?;

        row.into_notification()
    }

    async fn insert_once(
        &self,
        new_notification: NewNotification,
    ) -> Result<Option<Notification>> {
        let subject = new_notification.subject;
        // conflict target matches the partial unique index on post-scoped kinds
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, recipient_id, actor_id, kind, message, post_id, group_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (recipient_id, actor_id, kind, post_id)
                WHERE kind IN ('like', 'comment', 'share')
            DO NOTHING
            RETURNING id, recipient_id, actor_id, kind, message, post_id, group_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_notification.recipient_id)
        .bind(new_notification.actor_id)
        .bind(new_notification.kind.as_str())
        .bind(&new_notification.message)
        .bind(subject.and_then(|s| s.post_id()))
        .bind(subject.and_then(|s| s.group_id()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(NotificationRow::into_notification).transpose()
    }

    async fn exists(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        subject: NotificationSubject,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notifications
                WHERE recipient_id = $1
                  AND actor_id = $2
                  AND kind = $3
                  AND post_id IS NOT DISTINCT FROM $4
                  AND group_id IS NOT DISTINCT FROM $5
            )
            "#,
        )
        .bind(recipient_id)
        .bind(actor_id)
        .bind(kind.as_str())
        .bind(subject.post_id())
        .bind(subject.group_id())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<NotificationView>> {
        let rows = sqlx::query_as::<_, ViewRow>(
            r#"
            SELECT n.id, n.recipient_id, n.actor_id, n.kind, n.message, n.post_id, n.group_id,
                   n.created_at, u.username AS actor_username
            FROM notifications n
            JOIN users u ON u.id = n.actor_id
            WHERE n.recipient_id = $1
            ORDER BY n.created_at DESC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(NotificationView {
                    notification: row.notification.into_notification()?,
                    actor_username: row.actor_username,
                })
            })
            .collect()
    }
}
