//! Event fan-out
//!
//! Broadcast mode reaches every open channel and leaves audience filtering to the
//! client. Targeted mode reaches only the channels registered for one user.
//! Both are best-effort: a failed push is pruned and counted, never returned.

use crate::metrics;
use crate::websocket::{Delivery, PresenceRegistry, ServerEvent};
use uuid::Uuid;

const BROADCAST: &str = "broadcast";
const TARGETED: &str = "targeted";

fn record(mode: &str, delivery: Delivery) {
    metrics::record_push(mode, "delivered", delivery.delivered);
    metrics::record_push(mode, "pruned", delivery.pruned);
}

#[derive(Clone)]
pub struct EventRouter {
    registry: PresenceRegistry,
}

impl EventRouter {
    pub fn new(registry: PresenceRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// Returns the number of channels reached
    pub async fn broadcast(&self, event: ServerEvent) -> usize {
        let delivery = self.registry.broadcast(&event).await;
        record(BROADCAST, delivery);

        tracing::debug!(
            event = event.name(),
            delivered = delivery.delivered,
            pruned = delivery.pruned,
            "broadcast event"
        );
        delivery.delivered
    }

    /// Returns the number of the user's channels reached; zero when offline
    pub async fn send_to_user(&self, user_id: Uuid, event: ServerEvent) -> usize {
        let delivery = self.registry.send_to_user(user_id, &event).await;
        record(TARGETED, delivery);
        if delivery == Delivery::default() {
            metrics::record_push(TARGETED, "offline", 1);
        }

        tracing::debug!(
            event = event.name(),
            user_id = %user_id,
            delivered = delivery.delivered,
            pruned = delivery.pruned,
            "targeted event"
        );
        delivery.delivered
    }

    /// Same event to several users, each user once
    pub async fn send_to_users(&self, user_ids: &[Uuid], event: ServerEvent) -> usize {
        let mut seen = Vec::with_capacity(user_ids.len());
        let mut delivered = 0;
        for user_id in user_ids {
            if seen.contains(user_id) {
                continue;
            }
            seen.push(*user_id);
            delivered += self.send_to_user(*user_id, event.clone()).await;
        }
        delivered
    }
}
