use super::{require_user, required, EventRouter};
use crate::error::Result;
use crate::models::{Message, NewMessage};
use crate::repository::{MessageRepository, UserRepository};
use crate::websocket::ServerEvent;
use std::sync::Arc;
use uuid::Uuid;

/// Direct messages. A stored message is pushed to both parties so every open
/// device of the sender stays in sync too.
#[derive(Clone)]
pub struct MessagingService {
    users: Arc<dyn UserRepository>,
    messages: Arc<dyn MessageRepository>,
    router: EventRouter,
}

impl MessagingService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        messages: Arc<dyn MessageRepository>,
        router: EventRouter,
    ) -> Self {
        Self {
            users,
            messages,
            router,
        }
    }

    pub async fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: Option<&str>,
    ) -> Result<Message> {
        let content = required(content, "Sender ID, receiver ID, and content are required")?;
        let sender = require_user(self.users.as_ref(), sender_id, "Sender not found").await?;
        require_user(self.users.as_ref(), receiver_id, "Receiver not found").await?;

        let message = self
            .messages
            .insert(NewMessage {
                sender_id,
                receiver_id,
                content: content.to_string(),
            })
            .await?;

        let delivered = self
            .router
            .send_to_users(
                &[receiver_id, sender_id],
                ServerEvent::for_message(&message, &sender.username),
            )
            .await;
        tracing::debug!(message_id = %message.id, delivered, "message pushed");
        Ok(message)
    }

    pub async fn conversation(&self, user_id: Uuid, friend_id: Uuid) -> Result<Vec<Message>> {
        self.messages.conversation(user_id, friend_id).await
    }
}
