use crate::error::Result;
use crate::models::{NotificationKind, NotificationSubject};
use crate::repository::NotificationRepository;
use std::sync::Arc;
use uuid::Uuid;

/// Decides whether an action warrants a new notification record.
///
/// Rules, in order:
/// 1. receipt kinds addressed to their own actor always pass
/// 2. an actor never notifies themselves otherwise
/// 3. post-scoped kinds pass only if the dedup tuple has no record yet
/// 4. everything else passes
#[derive(Clone)]
pub struct NotificationDeduplicator {
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationDeduplicator {
    pub fn new(notifications: Arc<dyn NotificationRepository>) -> Self {
        Self { notifications }
    }

    pub async fn should_notify(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        subject: Option<NotificationSubject>,
    ) -> Result<bool> {
        if kind.is_receipt() {
            return Ok(true);
        }
        if actor_id == recipient_id {
            return Ok(false);
        }

        match subject {
            Some(subject) if kind.is_post_scoped() => {
                let exists = self
                    .notifications
                    .exists(recipient_id, actor_id, kind, subject)
                    .await?;
                Ok(!exists)
            }
            _ => Ok(true),
        }
    }
}
