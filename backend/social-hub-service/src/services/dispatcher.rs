use super::{EventRouter, NotificationDeduplicator};
use crate::error::Result;
use crate::metrics;
use crate::models::{NewNotification, Notification};
use crate::repository::NotificationRepository;
use crate::websocket::ServerEvent;
use std::sync::Arc;

/// Persists notification records, then pushes them to the recipient's channels.
///
/// A failed insert aborts the caller. The push runs only after the insert
/// succeeded and its outcome never reaches the caller; an offline recipient
/// finds the record on the next inbox fetch.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifications: Arc<dyn NotificationRepository>,
    dedup: NotificationDeduplicator,
    router: EventRouter,
}

impl NotificationDispatcher {
    pub fn new(notifications: Arc<dyn NotificationRepository>, router: EventRouter) -> Self {
        Self {
            dedup: NotificationDeduplicator::new(notifications.clone()),
            notifications,
            router,
        }
    }

    pub async fn dispatch(&self, new_notification: NewNotification) -> Result<Notification> {
        let notification = self.notifications.insert(new_notification).await?;
        self.deliver(&notification).await;
        Ok(notification)
    }

    /// Dedup check followed by dispatch; `None` when the action did not warrant a record.
    ///
    /// Post-scoped kinds go through the repository's atomic insert, so two
    /// concurrent identical actions still leave one record.
    pub async fn notify(&self, new_notification: NewNotification) -> Result<Option<Notification>> {
        let should_notify = self
            .dedup
            .should_notify(
                new_notification.recipient_id,
                new_notification.actor_id,
                new_notification.kind,
                new_notification.subject,
            )
            .await?;

        if !should_notify {
            Self::suppressed(&new_notification);
            return Ok(None);
        }

        let notification = if new_notification.kind.is_post_scoped()
            && new_notification.subject.is_some()
        {
            match self.notifications.insert_once(new_notification.clone()).await? {
                Some(notification) => notification,
                None => {
                    Self::suppressed(&new_notification);
                    return Ok(None);
                }
            }
        } else {
            self.notifications.insert(new_notification).await?
        };

        self.deliver(&notification).await;
        Ok(Some(notification))
    }

    async fn deliver(&self, notification: &Notification) {
        metrics::record_notification(notification.kind.as_str(), "created");

        let delivered = self
            .router
            .send_to_user(
                notification.recipient_id,
                ServerEvent::for_notification(notification),
            )
            .await;

        tracing::info!(
            notification_id = %notification.id,
            recipient_id = %notification.recipient_id,
            kind = notification.kind.as_str(),
            delivered,
            "notification dispatched"
        );
    }

    fn suppressed(new_notification: &NewNotification) {
        metrics::record_notification(new_notification.kind.as_str(), "suppressed");
        tracing::debug!(
            recipient_id = %new_notification.recipient_id,
            actor_id = %new_notification.actor_id,
            kind = new_notification.kind.as_str(),
            "notification suppressed"
        );
    }
}
