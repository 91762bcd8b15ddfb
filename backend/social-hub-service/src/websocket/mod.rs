//! Real-time delivery channels
//!
//! - `presence`: which live channels belong to which user
//! - `messages`: JSON frames exchanged over a channel
//! - `session`: per-connection actor (heartbeat, identity announce, outbound events)

pub mod messages;
pub mod presence;
pub mod session;

pub use messages::{ClientMessage, ServerEvent};
pub use presence::{ChannelId, Delivery, JoinError, PresenceRegistry};
pub use session::WsSession;
