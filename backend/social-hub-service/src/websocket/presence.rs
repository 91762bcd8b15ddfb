/// Presence registry
///
/// Tracks every open channel and, once a channel has announced its owner, which
/// user it belongs to. A user may hold several channels (one per device or tab);
/// targeted pushes reach all of them. Nothing here survives a restart.
use super::ServerEvent;
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

/// Identifier of one live channel, assigned at connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    /// A channel keeps the first identity it announced
    #[error("channel is already joined as user {0}")]
    AlreadyJoined(Uuid),

    #[error("channel is not connected")]
    UnknownChannel,
}

/// Outcome of one push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    /// Channels whose receiver was gone; removed during the push
    pub pruned: usize,
}

struct Channel {
    user_id: Option<Uuid>,
    sender: UnboundedSender<ServerEvent>,
}

#[derive(Default)]
struct Inner {
    channels: HashMap<ChannelId, Channel>,
    by_user: HashMap<Uuid, Vec<ChannelId>>,
}

impl Inner {
    fn remove(&mut self, channel_id: ChannelId) -> Option<Uuid> {
        let channel = self.channels.remove(&channel_id)?;
        let user_id = channel.user_id?;

        if let Some(ids) = self.by_user.get_mut(&user_id) {
            ids.retain(|id| *id != channel_id);
            if ids.is_empty() {
                self.by_user.remove(&user_id);
            }
        }
        Some(user_id)
    }
}

/// Shared handle; clones see the same registry
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an anonymous channel. It receives broadcasts right away and
    /// targeted events once it joins a user.
    pub async fn connect(&self) -> (ChannelId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        let channel_id = ChannelId::new();

        let mut guard = self.inner.write().await;
        guard.channels.insert(
            channel_id,
            Channel {
                user_id: None,
                sender: tx,
            },
        );
        metrics::set_ws_channels(guard.channels.len());

        tracing::debug!(%channel_id, total = guard.channels.len(), "channel connected");
        (channel_id, rx)
    }

    /// Register `channel_id` under `user_id`. Repeating the same announce is a no-op.
    pub async fn join(&self, user_id: Uuid, channel_id: ChannelId) -> Result<(), JoinError> {
        let mut guard = self.inner.write().await;
        let channel = guard
            .channels
            .get_mut(&channel_id)
            .ok_or(JoinError::UnknownChannel)?;

        match channel.user_id {
            Some(existing) if existing == user_id => return Ok(()),
            Some(existing) => return Err(JoinError::AlreadyJoined(existing)),
            None => channel.user_id = Some(user_id),
        }

        let ids = guard.by_user.entry(user_id).or_default();
        ids.push(channel_id);
        tracing::debug!(%channel_id, user_id = %user_id, channels = ids.len(), "channel joined");
        Ok(())
    }

    /// Drop a channel. Returns the identity it was registered under, if any.
    pub async fn leave(&self, channel_id: ChannelId) -> Option<Uuid> {
        let mut guard = self.inner.write().await;
        let user_id = guard.remove(channel_id);
        metrics::set_ws_channels(guard.channels.len());

        tracing::debug!(%channel_id, user_id = ?user_id, "channel left");
        user_id
    }

    /// Snapshot of the channels registered for `user_id`
    pub async fn channels_for(&self, user_id: Uuid) -> Vec<ChannelId> {
        let guard = self.inner.read().await;
        guard.by_user.get(&user_id).cloned().unwrap_or_default()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.by_user.contains_key(&user_id)
    }

    /// Push to every channel of `user_id`; dead channels are pruned
    pub async fn send_to_user(&self, user_id: Uuid, event: &ServerEvent) -> Delivery {
        let mut guard = self.inner.write().await;
        let Some(ids) = guard.by_user.get(&user_id).cloned() else {
            return Delivery::default();
        };

        let mut delivery = Delivery::default();
        let mut dead = Vec::new();
        for id in ids {
            match guard.channels.get(&id) {
                Some(channel) if channel.sender.send(event.clone()).is_ok() => {
                    delivery.delivered += 1
                }
                _ => dead.push(id),
            }
        }

        for id in dead {
            guard.remove(id);
            delivery.pruned += 1;
        }
        if delivery.pruned > 0 {
            metrics::set_ws_channels(guard.channels.len());
        }
        delivery
    }

    /// Push to every open channel, joined or not
    pub async fn broadcast(&self, event: &ServerEvent) -> Delivery {
        let mut guard = self.inner.write().await;

        let mut delivery = Delivery::default();
        let mut dead = Vec::new();
        for (id, channel) in guard.channels.iter() {
            if channel.sender.send(event.clone()).is_ok() {
                delivery.delivered += 1;
            } else {
                dead.push(*id);
            }
        }

        for id in dead {
            guard.remove(id);
            delivery.pruned += 1;
        }
        if delivery.pruned > 0 {
            metrics::set_ws_channels(guard.channels.len());
        }
        delivery
    }

    /// All open channels, joined or not
    pub async fn total_channels(&self) -> usize {
        self.inner.read().await.channels.len()
    }

    pub async fn connected_users_count(&self) -> usize {
        self.inner.read().await.by_user.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_join() {
        let registry = PresenceRegistry::new();
        let user_id = Uuid::new_v4();

        let (channel_id, _rx) = registry.connect().await;
        assert_eq!(registry.total_channels().await, 1);
        assert!(!registry.is_online(user_id).await);

        registry.join(user_id, channel_id).await.unwrap();
        assert_eq!(registry.channels_for(user_id).await, vec![channel_id]);
        assert_eq!(registry.connected_users_count().await, 1);

        // same identity again is fine
        registry.join(user_id, channel_id).await.unwrap();
        assert_eq!(registry.channels_for(user_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_channel_keeps_first_identity() {
        let registry = PresenceRegistry::new();
        let alice = Uuid::new_v4();
        let (channel_id, _rx) = registry.connect().await;

        registry.join(alice, channel_id).await.unwrap();
        let err = registry.join(Uuid::new_v4(), channel_id).await.unwrap_err();
        assert_eq!(err, JoinError::AlreadyJoined(alice));
        assert_eq!(registry.connected_users_count().await, 1);
    }

    #[tokio::test]
    async fn test_join_unknown_channel() {
        let registry = PresenceRegistry::new();
        assert_eq!(
            registry.join(Uuid::new_v4(), ChannelId::new()).await,
            Err(JoinError::UnknownChannel)
        );
    }

    #[tokio::test]
    async fn test_send_reaches_every_device() {
        let registry = PresenceRegistry::new();
        let user_id = Uuid::new_v4();
        let mut receivers = vec![];

        for _ in 0..3 {
            let (channel_id, rx) = registry.connect().await;
            registry.join(user_id, channel_id).await.unwrap();
            receivers.push(rx);
        }

        let event = ServerEvent::NewLike {
            post_id: Uuid::new_v4(),
        };
        let delivery = registry.send_to_user(user_id, &event).await;
        assert_eq!(delivery.delivered, 3);

        for mut rx in receivers {
            assert_eq!(rx.recv().await, Some(event.clone()));
        }
    }

    #[tokio::test]
    async fn test_offline_user_is_not_an_error() {
        let registry = PresenceRegistry::new();
        let delivery = registry.send_to_user(Uuid::new_v4(), &ServerEvent::Pong).await;
        assert_eq!(delivery, Delivery::default());
    }

    #[tokio::test]
    async fn test_broadcast_includes_anonymous_channels() {
        let registry = PresenceRegistry::new();
        let (joined, mut joined_rx) = registry.connect().await;
        registry.join(Uuid::new_v4(), joined).await.unwrap();
        let (_anon, mut anon_rx) = registry.connect().await;

        let delivery = registry.broadcast(&ServerEvent::Pong).await;
        assert_eq!(delivery.delivered, 2);
        assert_eq!(joined_rx.recv().await, Some(ServerEvent::Pong));
        assert_eq!(anon_rx.recv().await, Some(ServerEvent::Pong));
    }

    #[tokio::test]
    async fn test_dead_channels_are_pruned() {
        let registry = PresenceRegistry::new();
        let user_id = Uuid::new_v4();

        let (live, mut live_rx) = registry.connect().await;
        let (dead, dead_rx) = registry.connect().await;
        registry.join(user_id, live).await.unwrap();
        registry.join(user_id, dead).await.unwrap();
        drop(dead_rx);

        let delivery = registry.send_to_user(user_id, &ServerEvent::Pong).await;
        assert_eq!(delivery, Delivery { delivered: 1, pruned: 1 });
        assert_eq!(registry.channels_for(user_id).await, vec![live]);
        assert_eq!(live_rx.recv().await, Some(ServerEvent::Pong));
    }

    #[tokio::test]
    async fn test_leave_removes_user_when_last_channel_goes() {
        let registry = PresenceRegistry::new();
        let user_id = Uuid::new_v4();
        let (channel_id, _rx) = registry.connect().await;
        registry.join(user_id, channel_id).await.unwrap();

        assert_eq!(registry.leave(channel_id).await, Some(user_id));
        assert!(!registry.is_online(user_id).await);
        assert_eq!(registry.total_channels().await, 0);
        assert_eq!(registry.leave(channel_id).await, None);
    }
}
