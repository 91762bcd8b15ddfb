//! Notification core (dedup, dispatch, fan-out, auto-responder) and the domain
//! services that drive it

pub mod auto_responder;
pub mod dedup;
pub mod dispatcher;
pub mod friendships;
pub mod groups;
pub mod media;
pub mod messaging;
pub mod password;
pub mod posts;
pub mod router;
pub mod users;

pub use auto_responder::{AutoResponder, PrefixAutoResponder};
pub use dedup::NotificationDeduplicator;
pub use dispatcher::NotificationDispatcher;
pub use friendships::{FriendRequestOutcome, FriendshipService};
pub use groups::GroupService;
pub use media::{LocalMediaStore, MediaKind, MediaStore, MediaUpload};
pub use messaging::MessagingService;
pub use posts::PostService;
pub use router::EventRouter;
pub use users::UserService;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::repository::UserRepository;
use uuid::Uuid;

/// Resolve a referenced user or fail with `NotFound(missing)`
pub(crate) async fn require_user(
    users: &dyn UserRepository,
    user_id: Uuid,
    missing: &str,
) -> Result<User> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(missing))
}

/// Trimmed non-empty text or `Validation(msg)`
pub(crate) fn required<'a>(value: Option<&'a str>, msg: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(msg))
}
