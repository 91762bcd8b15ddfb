//! PostgreSQL-backed repositories
//!
//! Enum columns are stored as text and decoded through private row structs.

mod friendships;
mod groups;
mod messages;
mod notifications;
mod posts;
mod users;

pub use friendships::PgFriendshipRepository;
pub use groups::PgGroupRepository;
pub use messages::PgMessageRepository;
pub use notifications::PgNotificationRepository;
pub use posts::PgPostRepository;
pub use users::PgUserRepository;

use crate::error::AppError;

/// A stored enum column held a value this build does not know
pub(crate) fn corrupt_column(column: &str, value: &str) -> AppError {
    AppError::Internal(format!("unexpected {} value '{}'", column, value))
}
