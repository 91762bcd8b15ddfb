//! Process-local store behind every repository trait
//!
//! All tables live under one lock, so each trait method is atomic with respect to
//! the others (the two-row friendship accept in particular).

use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentWithAuthor, FriendRequestView, FriendshipEdge, FriendshipStatus, Group,
    GroupMember, GroupRole, GroupView, Message, NewComment, NewGroup, NewMessage, NewNotification,
    NewPost, NewUser, Notification, NotificationKind, NotificationSubject, NotificationView,
    PostPrivacy, PostWithAuthor, ProfileUpdate, Share, User, UserCredentials, UserSummary,
};
use crate::repository::{
    FriendshipRepository, GroupRepository, MessageRepository, NotificationRepository,
    PostRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredUser {
    user: User,
    password_hash: String,
}

struct StoredPost {
    id: Uuid,
    user_id: Uuid,
    content: String,
    media_url: Option<String>,
    privacy: PostPrivacy,
    created_at: DateTime<Utc>,
}

struct Membership {
    group_id: Uuid,
    user_id: Uuid,
    role: GroupRole,
}

/// Rows are kept in insertion order
#[derive(Default)]
struct Tables {
    users: Vec<StoredUser>,
    posts: Vec<StoredPost>,
    likes: Vec<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    shares: Vec<Share>,
    friendships: Vec<FriendshipEdge>,
    groups: Vec<Group>,
    memberships: Vec<Membership>,
    notifications: Vec<Notification>,
    messages: Vec<Message>,
}

impl Tables {
    fn user(&self, user_id: Uuid) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| &u.user)
    }

    fn with_author(&self, post: &StoredPost) -> Option<PostWithAuthor> {
        let author = self.user(post.user_id)?;
        Some(PostWithAuthor {
            id: post.id,
            user_id: post.user_id,
            content: post.content.clone(),
            media_url: post.media_url.clone(),
            privacy: post.privacy,
            created_at: post.created_at,
            username: author.username.clone(),
            name: author.name.clone(),
            profile_picture: author.profile_picture.clone(),
        })
    }

    fn edge_between(&self, a: Uuid, b: Uuid, status: Option<FriendshipStatus>) -> bool {
        self.friendships.iter().any(|e| {
            ((e.requester_id == a && e.target_id == b) || (e.requester_id == b && e.target_id == a))
                && status.map_or(true, |s| e.status == s)
        })
    }

    fn has_notification(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        subject: NotificationSubject,
    ) -> bool {
        self.notifications.iter().any(|n| {
            n.recipient_id == recipient_id
                && n.actor_id == actor_id
                && n.kind == kind
                && n.subject() == Some(subject)
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.user.username == new_user.username)
        {
            return Err(AppError::conflict("Username is already taken"));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            name: new_user.name,
            bio: None,
            profile_picture: None,
            created_at: Utc::now(),
        };
        tables.users.push(StoredUser {
            user: user.clone(),
            password_hash: new_user.password_hash,
        });
        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.user(user_id).cloned())
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.user.username == username)
            .map(|u| UserCredentials {
                user: u.user.clone(),
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.users.iter_mut().find(|u| u.user.id == user_id) else {
            return Ok(None);
        };

        stored.user.name = update.name;
        stored.user.bio = update.bio;
        if let Some(picture) = update.profile_picture {
            stored.user.profile_picture = Some(picture);
        }
        Ok(Some(stored.user.clone()))
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, new_post: NewPost) -> Result<PostWithAuthor> {
        let mut tables = self.tables.write().await;
        let post = StoredPost {
            id: Uuid::new_v4(),
            user_id: new_post.user_id,
            content: new_post.content,
            media_url: new_post.media_url,
            privacy: new_post.privacy,
            created_at: Utc::now(),
        };
        let view = tables
            .with_author(&post)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        tables.posts.push(post);
        Ok(view)
    }

    async fn find_owner(&self, post_id: Uuid) -> Result<Option<Uuid>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .map(|p| p.user_id))
    }

    async fn visible_feed(&self, viewer_id: Uuid) -> Result<Vec<PostWithAuthor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .rev()
            .filter(|p| {
                p.privacy == PostPrivacy::Public
                    || p.user_id == viewer_id
                    || tables.edge_between(viewer_id, p.user_id, Some(FriendshipStatus::Accepted))
            })
            .filter_map(|p| tables.with_author(p))
            .collect())
    }

    async fn insert_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.likes.contains(&(post_id, user_id)) {
            return Ok(false);
        }
        tables.likes.push((post_id, user_id));
        Ok(true)
    }

    async fn like_count(&self, post_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.likes.iter().filter(|(p, _)| *p == post_id).count() as i64)
    }

    async fn insert_comment(&self, new_comment: NewComment) -> Result<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: new_comment.post_id,
            user_id: new_comment.user_id,
            content: new_comment.content,
            created_at: Utc::now(),
        };
        self.tables.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comments_for(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                tables.user(c.user_id).map(|author| CommentWithAuthor {
                    id: c.id,
                    post_id: c.post_id,
                    user_id: c.user_id,
                    content: c.content.clone(),
                    created_at: c.created_at,
                    username: author.username.clone(),
                })
            })
            .collect())
    }

    async fn insert_share(&self, post_id: Uuid, user_id: Uuid) -> Result<Share> {
        let share = Share {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            created_at: Utc::now(),
        };
        self.tables.write().await.shares.push(share.clone());
        Ok(share)
    }
}

#[async_trait]
impl FriendshipRepository for MemoryStore {
    async fn find_active_edge(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<FriendshipEdge>> {
        let tables = self.tables.read().await;
        Ok(tables
            .friendships
            .iter()
            .find(|e| {
                (e.requester_id == user_a && e.target_id == user_b)
                    || (e.requester_id == user_b && e.target_id == user_a)
            })
            .cloned())
    }

    async fn create_request(&self, requester_id: Uuid, target_id: Uuid) -> Result<FriendshipEdge> {
        let mut tables = self.tables.write().await;
        if tables
            .friendships
            .iter()
            .any(|e| e.requester_id == requester_id && e.target_id == target_id)
        {
            return Err(AppError::conflict("Friend request already exists"));
        }

        let edge = FriendshipEdge {
            id: Uuid::new_v4(),
            requester_id,
            target_id,
            status: FriendshipStatus::Pending,
            created_at: Utc::now(),
        };
        tables.friendships.push(edge.clone());
        Ok(edge)
    }

    async fn accept_request(&self, requester_id: Uuid, target_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(pending) = tables.friendships.iter_mut().find(|e| {
            e.requester_id == requester_id
                && e.target_id == target_id
                && e.status == FriendshipStatus::Pending
        }) else {
            return Ok(false);
        };
        pending.status = FriendshipStatus::Accepted;

        let reverse = tables
            .friendships
            .iter()
            .position(|e| e.requester_id == target_id && e.target_id == requester_id);
        match reverse {
            Some(idx) => tables.friendships[idx].status = FriendshipStatus::Accepted,
            None => tables.friendships.push(FriendshipEdge {
                id: Uuid::new_v4(),
                requester_id: target_id,
                target_id: requester_id,
                status: FriendshipStatus::Accepted,
                created_at: Utc::now(),
            }),
        }
        Ok(true)
    }

    async fn delete_pending(&self, request_id: Uuid) -> Result<Option<FriendshipEdge>> {
        let mut tables = self.tables.write().await;
        let position = tables
            .friendships
            .iter()
            .position(|e| e.id == request_id && e.status == FriendshipStatus::Pending);
        Ok(position.map(|idx| tables.friendships.remove(idx)))
    }

    async fn pending_for(&self, target_id: Uuid) -> Result<Vec<FriendRequestView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .friendships
            .iter()
            .rev()
            .filter(|e| e.target_id == target_id && e.status == FriendshipStatus::Pending)
            .filter_map(|e| {
                tables.user(e.requester_id).map(|from| FriendRequestView {
                    id: e.id,
                    from_user_id: from.id,
                    username: from.username.clone(),
                    name: from.name.clone(),
                })
            })
            .collect())
    }

    async fn friends_of(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        let mut seen = HashSet::new();
        let mut friends: Vec<UserSummary> = tables
            .friendships
            .iter()
            .filter(|e| e.status == FriendshipStatus::Accepted)
            .filter_map(|e| {
                if e.requester_id == user_id {
                    Some(e.target_id)
                } else if e.target_id == user_id {
                    Some(e.requester_id)
                } else {
                    None
                }
            })
            .filter(|other| seen.insert(*other))
            .filter_map(|other| tables.user(other).map(UserSummary::from))
            .collect();
        friends.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(friends)
    }

    async fn suggestions(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        let mut candidates: Vec<UserSummary> = tables
            .users
            .iter()
            .map(|u| &u.user)
            .filter(|u| u.id != user_id && !tables.edge_between(user_id, u.id, None))
            .map(UserSummary::from)
            .collect();
        candidates.sort_by(|a, b| a.username.cmp(&b.username));
        candidates.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(candidates)
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create_with_admin(&self, new_group: NewGroup) -> Result<Group> {
        let mut tables = self.tables.write().await;
        let group = Group {
            id: Uuid::new_v4(),
            name: new_group.name,
            description: new_group.description,
            owner_id: new_group.owner_id,
            created_at: Utc::now(),
        };
        tables.groups.push(group.clone());
        tables.memberships.push(Membership {
            group_id: group.id,
            user_id: group.owner_id,
            role: GroupRole::Admin,
        });
        Ok(group)
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == group_id).cloned())
    }

    async fn membership_role(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<GroupRole>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .map(|m| m.role))
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid, role: GroupRole) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .memberships
            .iter()
            .any(|m| m.group_id == group_id && m.user_id == user_id)
        {
            return Err(AppError::conflict("User is already a member of this group"));
        }
        tables.memberships.push(Membership {
            group_id,
            user_id,
            role,
        });
        Ok(())
    }

    async fn groups_for(&self, user_id: Uuid) -> Result<Vec<GroupView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .iter()
            .rev()
            .filter(|g| {
                tables
                    .memberships
                    .iter()
                    .any(|m| m.group_id == g.id && m.user_id == user_id)
            })
            .filter_map(|g| {
                tables.user(g.owner_id).map(|owner| GroupView {
                    id: g.id,
                    name: g.name.clone(),
                    description: g.description.clone(),
                    owner_id: g.owner_id,
                    created_at: g.created_at,
                    owner_username: owner.username.clone(),
                })
            })
            .collect())
    }

    async fn members(&self, group_id: Uuid) -> Result<Vec<GroupMember>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .filter_map(|m| {
                tables.user(m.user_id).map(|u| GroupMember {
                    id: u.id,
                    username: u.username.clone(),
                    name: u.name.clone(),
                    profile_picture: u.profile_picture.clone(),
                    role: m.role,
                })
            })
            .collect())
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert(&self, new_notification: NewNotification) -> Result<Notification> {
        let notification = new_notification.into_notification(Uuid::new_v4(), Utc::now());
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn insert_once(
        &self,
        new_notification: NewNotification,
    ) -> Result<Option<Notification>> {
        let mut tables = self.tables.write().await;
        if let Some(subject) = new_notification.subject {
            if tables.has_notification(
                new_notification.recipient_id,
                new_notification.actor_id,
                new_notification.kind,
                subject,
            ) {
                return Ok(None);
            }
        }
        let notification = new_notification.into_notification(Uuid::new_v4(), Utc::now());
        tables.notifications.push(notification.clone());
        Ok(Some(notification))
    }

    async fn exists(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: NotificationKind,
        subject: NotificationSubject,
    ) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.has_notification(recipient_id, actor_id, kind, subject))
    }

    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<NotificationView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id)
            .filter_map(|n| {
                tables.user(n.actor_id).map(|actor| NotificationView {
                    notification: n.clone(),
                    actor_username: actor.username.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn insert(&self, new_message: NewMessage) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            sender_id: new_message.sender_id,
            receiver_id: new_message.receiver_id,
            content: new_message.content,
            created_at: Utc::now(),
        };
        self.tables.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(store: &MemoryStore, username: &str) -> User {
        UserRepository::create_user(
            store,
            NewUser {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                name: username.to_uppercase(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        user(&store, "alice").await;
        let err = UserRepository::create_user(
            &store,
            NewUser {
                username: "alice".to_string(),
                password_hash: "other".to_string(),
                name: "Other".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_accept_writes_both_directions() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;

        store.create_request(alice.id, bob.id).await.unwrap();
        assert!(store.friends_of(alice.id).await.unwrap().is_empty());

        assert!(store.accept_request(alice.id, bob.id).await.unwrap());
        let friends_of_bob = store.friends_of(bob.id).await.unwrap();
        assert_eq!(friends_of_bob.len(), 1);
        assert_eq!(friends_of_bob[0].id, alice.id);

        let accepted = store
            .tables
            .read()
            .await
            .friendships
            .iter()
            .filter(|e| e.status == FriendshipStatus::Accepted)
            .count();
        assert_eq!(accepted, 2);

        let friends = store.friends_of(alice.id).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].id, bob.id);

        // nothing pending any more
        assert!(!store.accept_request(alice.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_pending_ignores_accepted_rows() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;

        let edge = store.create_request(alice.id, bob.id).await.unwrap();
        store.accept_request(alice.id, bob.id).await.unwrap();

        assert!(store.delete_pending(edge.id).await.unwrap().is_none());
        assert_eq!(store.friends_of(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_suggestions_exclude_self_and_edges() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let carol = user(&store, "carol").await;
        let dave = user(&store, "dave").await;

        store.create_request(bob.id, alice.id).await.unwrap();
        store.create_request(alice.id, carol.id).await.unwrap();
        store.accept_request(alice.id, carol.id).await.unwrap();

        let suggested: Vec<Uuid> = store
            .suggestions(alice.id, 15)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(suggested, vec![dave.id]);

        assert!(store.suggestions(alice.id, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feed_visibility() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let carol = user(&store, "carol").await;

        let private = store
            .create_post(NewPost {
                user_id: bob.id,
                content: "friends only".to_string(),
                media_url: None,
                privacy: PostPrivacy::Friends,
            })
            .await
            .unwrap();

        assert!(store.visible_feed(alice.id).await.unwrap().is_empty());
        assert_eq!(store.visible_feed(bob.id).await.unwrap().len(), 1);

        store.create_request(alice.id, bob.id).await.unwrap();
        store.accept_request(alice.id, bob.id).await.unwrap();

        let feed = store.visible_feed(alice.id).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, private.id);
        assert_eq!(feed[0].username, "bob");
        assert!(store.visible_feed(carol.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_exists_matches_subject() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let post = Uuid::new_v4();

        NotificationRepository::insert(
            &store,
            NewNotification::new(bob.id, alice.id, NotificationKind::Like, "alice liked your post")
                .about(NotificationSubject::Post(post)),
        )
        .await
        .unwrap();

        assert!(store
            .exists(bob.id, alice.id, NotificationKind::Like, NotificationSubject::Post(post))
            .await
            .unwrap());
        assert!(!store
            .exists(
                bob.id,
                alice.id,
                NotificationKind::Like,
                NotificationSubject::Post(Uuid::new_v4())
            )
            .await
            .unwrap());
        assert!(!store
            .exists(bob.id, alice.id, NotificationKind::Comment, NotificationSubject::Post(post))
            .await
            .unwrap());

        let inbox = store.list_for(bob.id).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].actor_username, "alice");
    }

    #[tokio::test]
    async fn test_insert_once_keeps_first_post_scoped_record() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let post = Uuid::new_v4();
        let share = || {
            NewNotification::new(bob.id, alice.id, NotificationKind::Share, "alice shared your post")
                .about(NotificationSubject::Post(post))
        };

        let first = store.insert_once(share()).await.unwrap();
        assert!(first.is_some());
        assert!(store.insert_once(share()).await.unwrap().is_none());

        // a different post is a different tuple
        let other = NewNotification::new(
            bob.id,
            alice.id,
            NotificationKind::Share,
            "alice shared your post",
        )
        .about(NotificationSubject::Post(Uuid::new_v4()));
        assert!(store.insert_once(other).await.unwrap().is_some());

        let inbox = store.list_for(bob.id).await.unwrap();
        assert_eq!(inbox.len(), 2);
        assert!(inbox.iter().any(|v| Some(&v.notification) == first.as_ref()));
    }
}
