/// Frames exchanged over a real-time channel.
///
/// Every frame is `{"event": "<name>", "data": {...}}`.
use crate::models::{Message, Notification, PostWithAuthor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ChannelId;

/// Server → client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once when the channel opens
    Connected { channel_id: ChannelId },

    /// Identity announce accepted
    Joined { user_id: Uuid },

    Pong,

    Error { code: String, message: String },

    NewNotification {
        user_id: Uuid,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        post_id: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        group_id: Option<Uuid>,
        notification_id: Uuid,
    },

    NewFriendRequest {
        user_id: Uuid,
        message: String,
        from_user_id: Uuid,
        notification_id: Uuid,
    },

    NewFriendAccepted { user_id: Uuid, friend_id: Uuid },

    NewMessage {
        id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        created_at: DateTime<Utc>,
        sender_username: String,
    },

    NewPost(PostWithAuthor),

    NewComment {
        post_id: Uuid,
        comment_id: Uuid,
        user_id: Uuid,
        content: String,
    },

    NewLike { post_id: Uuid },
}

impl ServerEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Targeted push for a stored notification.
    ///
    /// Friend requests carry the requester id, everything else the optional subject.
    pub fn for_notification(notification: &Notification) -> Self {
        match notification.kind {
            crate::models::NotificationKind::FriendRequest => ServerEvent::NewFriendRequest {
                user_id: notification.recipient_id,
                message: notification.message.clone(),
                from_user_id: notification.actor_id,
                notification_id: notification.id,
            },
            _ => ServerEvent::NewNotification {
                user_id: notification.recipient_id,
                message: notification.message.clone(),
                post_id: notification.post_id,
                group_id: notification.group_id,
                notification_id: notification.id,
            },
        }
    }

    pub fn for_message(message: &Message, sender_username: &str) -> Self {
        ServerEvent::NewMessage {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            created_at: message.created_at,
            sender_username: sender_username.to_string(),
        }
    }

    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::Joined { .. } => "joined",
            ServerEvent::Pong => "pong",
            ServerEvent::Error { .. } => "error",
            ServerEvent::NewNotification { .. } => "new_notification",
            ServerEvent::NewFriendRequest { .. } => "new_friend_request",
            ServerEvent::NewFriendAccepted { .. } => "new_friend_accepted",
            ServerEvent::NewMessage { .. } => "new_message",
            ServerEvent::NewPost(_) => "new_post",
            ServerEvent::NewComment { .. } => "new_comment",
            ServerEvent::NewLike { .. } => "new_like",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Client → server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Announce the identity that owns this channel
    JoinUserRoom { user_id: Uuid },
    Ping {},
}

impl ClientMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;
    use serde_json::Value;

    fn notification(kind: NotificationKind) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            kind,
            message: "bob sent you a friend request".to_string(),
            post_id: None,
            group_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_envelope() {
        let post_id = Uuid::new_v4();
        let json: Value =
            serde_json::from_str(&ServerEvent::NewLike { post_id }.to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "new_like");
        assert_eq!(json["data"]["post_id"], post_id.to_string());
    }

    #[test]
    fn test_friend_request_notification_maps_to_friend_request_event() {
        let n = notification(NotificationKind::FriendRequest);
        match ServerEvent::for_notification(&n) {
            ServerEvent::NewFriendRequest {
                from_user_id,
                notification_id,
                ..
            } => {
                assert_eq!(from_user_id, n.actor_id);
                assert_eq!(notification_id, n.id);
            }
            other => panic!("unexpected event {:?}", other),
        }

        let accepted = notification(NotificationKind::FriendAccepted);
        assert_eq!(
            ServerEvent::for_notification(&accepted).name(),
            "new_notification"
        );
    }

    #[test]
    fn test_absent_subject_is_omitted() {
        let n = notification(NotificationKind::GroupJoined);
        let json: Value =
            serde_json::from_str(&ServerEvent::for_notification(&n).to_json().unwrap()).unwrap();
        assert!(json["data"].get("post_id").is_none());
        assert_eq!(json["data"]["user_id"], n.recipient_id.to_string());
    }

    #[test]
    fn test_parse_client_messages() {
        let user_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"event":"join_user_room","data":{{"user_id":"{}"}}}}"#,
            user_id
        );
        assert_eq!(
            ClientMessage::from_json(&raw).unwrap(),
            ClientMessage::JoinUserRoom { user_id }
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"event":"ping","data":{}}"#).unwrap(),
            ClientMessage::Ping {}
        );
        assert!(ClientMessage::from_json(r#"{"event":"leave"}"#).is_err());
    }
}
