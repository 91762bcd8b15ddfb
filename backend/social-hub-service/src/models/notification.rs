use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification kind enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone liked the recipient's post
    Like,
    /// Someone commented on the recipient's post
    Comment,
    /// Someone shared the recipient's post
    Share,
    /// Someone asked to be the recipient's friend
    FriendRequest,
    /// Receipt to the requester
    FriendRequestSent,
    /// Issued to both parties of an accepted request
    FriendAccepted,
    /// Receipt to the group creator
    GroupCreated,
    /// Receipt to a user who joined a group
    GroupJoined,
    /// An admin added the recipient to a group
    GroupInvite,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 9] = [
        NotificationKind::Like,
        NotificationKind::Comment,
        NotificationKind::Share,
        NotificationKind::FriendRequest,
        NotificationKind::FriendRequestSent,
        NotificationKind::FriendAccepted,
        NotificationKind::GroupCreated,
        NotificationKind::GroupJoined,
        NotificationKind::GroupInvite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Share => "share",
            NotificationKind::FriendRequest => "friend_request",
            NotificationKind::FriendRequestSent => "friend_request_sent",
            NotificationKind::FriendAccepted => "friend_accepted",
            NotificationKind::GroupCreated => "group_created",
            NotificationKind::GroupJoined => "group_joined",
            NotificationKind::GroupInvite => "group_invite",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Kinds about a post; at most one record per (recipient, actor, kind, post)
    pub fn is_post_scoped(&self) -> bool {
        matches!(
            self,
            NotificationKind::Like | NotificationKind::Comment | NotificationKind::Share
        )
    }

    /// Kinds that may be addressed to their own actor as an informational receipt
    pub fn is_receipt(&self) -> bool {
        matches!(
            self,
            NotificationKind::FriendRequestSent
                | NotificationKind::FriendAccepted
                | NotificationKind::GroupCreated
                | NotificationKind::GroupJoined
        )
    }
}

/// What a notification is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum NotificationSubject {
    Post(Uuid),
    Group(Uuid),
}

impl NotificationSubject {
    pub fn post_id(&self) -> Option<Uuid> {
        match self {
            NotificationSubject::Post(id) => Some(*id),
            NotificationSubject::Group(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<Uuid> {
        match self {
            NotificationSubject::Group(id) => Some(*id),
            NotificationSubject::Post(_) => None,
        }
    }

    pub fn from_columns(post_id: Option<Uuid>, group_id: Option<Uuid>) -> Option<Self> {
        post_id
            .map(NotificationSubject::Post)
            .or(group_id.map(NotificationSubject::Group))
    }
}

/// Stored notification; never mutated after insert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    /// Recipient user ID
    pub recipient_id: Uuid,
    /// User whose action produced the notification
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    /// Human-readable text, rendered as-is by clients
    pub message: String,
    pub post_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn subject(&self) -> Option<NotificationSubject> {
        NotificationSubject::from_columns(self.post_id, self.group_id)
    }
}

/// Request to create a notification
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub subject: Option<NotificationSubject>,
}

impl NewNotification {
    pub fn new(
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id,
            actor_id,
            kind,
            message: message.into(),
            subject: None,
        }
    }

    pub fn about(mut self, subject: NotificationSubject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn into_notification(self, id: Uuid, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id,
            recipient_id: self.recipient_id,
            actor_id: self.actor_id,
            kind: self.kind,
            message: self.message,
            post_id: self.subject.and_then(|s| s.post_id()),
            group_id: self.subject.and_then(|s| s.group_id()),
            created_at,
        }
    }
}

/// Inbox row: the notification plus the actor's handle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub actor_username: String,
}
