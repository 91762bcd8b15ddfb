//! Domain entities shared by repositories, services and handlers

pub mod friendship;
pub mod group;
pub mod message;
pub mod notification;
pub mod post;
pub mod user;

pub use friendship::{FriendRequestView, FriendshipEdge, FriendshipStatus};
pub use group::{Group, GroupMember, GroupRole, GroupView, NewGroup};
pub use message::{Message, NewMessage};
pub use notification::{
    NewNotification, Notification, NotificationKind, NotificationSubject, NotificationView,
};
pub use post::{
    Comment, CommentWithAuthor, NewComment, NewPost, PostPrivacy, PostWithAuthor, Share,
};
pub use user::{NewUser, ProfileUpdate, User, UserCredentials, UserSummary};
