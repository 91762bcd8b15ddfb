use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FriendshipStatus::Pending),
            "accepted" => Some(FriendshipStatus::Accepted),
            _ => None,
        }
    }
}

/// One directed row of the friendship graph.
///
/// An accepted friendship is always two rows (A→B and B→A), both accepted.
/// A pending request is the single row requester→target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendshipEdge {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub target_id: Uuid,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

/// Incoming pending request as listed to its target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct FriendRequestView {
    /// Request id, used to reject
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub username: String,
    pub name: String,
}
