//! Persistence collaborator
//!
//! Every aggregate is reached through an object-safe trait so the services can run
//! against PostgreSQL in production and against [`MemoryStore`] in tests and demos.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{
    Comment, CommentWithAuthor, FriendRequestView, FriendshipEdge, Group, GroupMember, GroupRole,
    GroupView, Message, NewComment, NewGroup, NewMessage, NewNotification, NewPost, NewUser,
    Notification, NotificationKind, NotificationSubject, NotificationView, PostWithAuthor,
    ProfileUpdate, Share, User, UserCredentials, UserSummary,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>>;

    /// Returns `None` when the user does not exist
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Option<User>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, new_post: NewPost) -> Result<PostWithAuthor>;

    async fn find_owner(&self, post_id: Uuid) -> Result<Option<Uuid>>;

    /// Public posts, the viewer's own posts, and friends-only posts of the viewer's friends,
    /// newest first
    async fn visible_feed(&self, viewer_id: Uuid) -> Result<Vec<PostWithAuthor>>;

    /// Returns false when (post, user) already has a like row
    async fn insert_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn like_count(&self, post_id: Uuid) -> Result<i64>;

    async fn insert_comment(&self, new_comment: NewComment) -> Result<Comment>;

    /// Oldest first
    async fn comments_for(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>>;

    async fn insert_share(&self, post_id: Uuid, user_id: Uuid) -> Result<Share>;
}

/// Directed friendship rows.
///
/// Accepting writes both directions in one atomic step, so every accepted
/// friendship is a pair of accepted rows.
#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    /// Pending or accepted row between the two users, in either direction
    async fn find_active_edge(&self, user_a: Uuid, user_b: Uuid)
        -> Result<Option<FriendshipEdge>>;

    async fn create_request(&self, requester_id: Uuid, target_id: Uuid) -> Result<FriendshipEdge>;

    /// Flips the pending requester→target row and upserts target→requester as accepted.
    /// Returns false when there was no pending request.
    async fn accept_request(&self, requester_id: Uuid, target_id: Uuid) -> Result<bool>;

    /// Deletes a pending row by id; accepted rows are never touched
    async fn delete_pending(&self, request_id: Uuid) -> Result<Option<FriendshipEdge>>;

    /// Incoming pending requests for `target_id`
    async fn pending_for(&self, target_id: Uuid) -> Result<Vec<FriendRequestView>>;

    /// Union of both accepted directions, deduplicated by the other party, ordered by name
    async fn friends_of(&self, user_id: Uuid) -> Result<Vec<UserSummary>>;

    /// Everyone except self and anyone with a pending/accepted edge to self
    async fn suggestions(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Inserts the group and the owner's admin membership atomically
    async fn create_with_admin(&self, new_group: NewGroup) -> Result<Group>;

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>>;

    async fn membership_role(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<GroupRole>>;

    /// Fails with `Conflict` when the user is already a member
    async fn add_member(&self, group_id: Uuid, user_id: Uuid, role: GroupRole) -> Result<()>;

    async fn groups_for(&self, user_id: Uuid) -> Result<Vec<GroupView>>;

    async fn members(&self, group_id: Uuid) -> Result<Vec<GroupMember>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, new_notification: NewNotification) -> Result<Notification>;

    /// Insert a post-scoped notification unless its dedup tuple is already stored.
    /// The check and the write are one atomic step; `None` means a record existed.
    async fn insert_once(&self, new_notification: NewNotification)
        -> Result<Option<Notification>>;

    /// Whether the dedup tuple already has a record
    async fn exists(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        subject: NotificationSubject,
    ) -> Result<bool>;

    /// Newest first
    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<NotificationView>>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, new_message: NewMessage) -> Result<Message>;

    /// Both directions between the two users, oldest first
    async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>>;
}

/// Bundle of repository handles shared by the services
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub friendships: Arc<dyn FriendshipRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            posts: Arc::new(postgres::PgPostRepository::new(pool.clone())),
            friendships: Arc::new(postgres::PgFriendshipRepository::new(pool.clone())),
            groups: Arc::new(postgres::PgGroupRepository::new(pool.clone())),
            notifications: Arc::new(postgres::PgNotificationRepository::new(pool.clone())),
            messages: Arc::new(postgres::PgMessageRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    /// All six handles point at the same store
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            posts: store.clone(),
            friendships: store.clone(),
            groups: store.clone(),
            notifications: store.clone(),
            messages: store,
        }
    }
}
