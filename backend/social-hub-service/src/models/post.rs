use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post audience
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostPrivacy {
    /// Everyone
    #[default]
    Public,
    /// Accepted friends of the author (and the author)
    Friends,
}

impl PostPrivacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostPrivacy::Public => "public",
            PostPrivacy::Friends => "friends",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "public" => Some(PostPrivacy::Public),
            "friends" => Some(PostPrivacy::Friends),
            _ => None,
        }
    }
}

/// Post joined with its author, the shape both the feed and `new_post` carry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub media_url: Option<String>,
    pub privacy: PostPrivacy,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub name: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub content: String,
    pub media_url: Option<String>,
    pub privacy: PostPrivacy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
}

/// One share action; repeated shares are all recorded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Share {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
