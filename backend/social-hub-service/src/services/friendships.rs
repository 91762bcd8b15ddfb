//! Friend request state machine
//!
//! `none -> pending` on request, `pending -> accepted` (both directions) on accept,
//! `pending -> none` on reject. Rejection is silent: the requester is not told.

use super::{require_user, AutoResponder, EventRouter, NotificationDispatcher};
use crate::error::{AppError, Result};
use crate::models::{
    FriendRequestView, FriendshipEdge, NewNotification, NotificationKind, User, UserSummary,
};
use crate::repository::{FriendshipRepository, UserRepository};
use crate::websocket::ServerEvent;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FriendRequestOutcome {
    pub request: FriendshipEdge,
    /// The auto-responder accepted on the target's behalf
    pub auto_accepted: bool,
}

#[derive(Clone)]
pub struct FriendshipService {
    users: Arc<dyn UserRepository>,
    friendships: Arc<dyn FriendshipRepository>,
    dispatcher: NotificationDispatcher,
    router: EventRouter,
    auto_responder: Arc<dyn AutoResponder>,
    suggestion_limit: i64,
}

impl FriendshipService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        friendships: Arc<dyn FriendshipRepository>,
        dispatcher: NotificationDispatcher,
        router: EventRouter,
        auto_responder: Arc<dyn AutoResponder>,
        suggestion_limit: i64,
    ) -> Self {
        Self {
            users,
            friendships,
            dispatcher,
            router,
            auto_responder,
            suggestion_limit,
        }
    }

    pub async fn send_request(
        &self,
        requester_id: Uuid,
        target_id: Uuid,
    ) -> Result<FriendRequestOutcome> {
        if requester_id == target_id {
            return Err(AppError::validation("Invalid user or friend ID"));
        }
        let requester = require_user(self.users.as_ref(), requester_id, "Sender not found").await?;
        let target = require_user(self.users.as_ref(), target_id, "Friend not found").await?;

        if self
            .friendships
            .find_active_edge(requester_id, target_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Friend request already sent or accepted"));
        }

        let request = self
            .friendships
            .create_request(requester_id, target_id)
            .await?;
        tracing::info!(
            request_id = %request.id,
            requester_id = %requester_id,
            target_id = %target_id,
            "friend request created"
        );

        self.dispatcher
            .notify(NewNotification::new(
                target_id,
                requester_id,
                NotificationKind::FriendRequest,
                format!("{} sent you a friend request", requester.username),
            ))
            .await?;
        self.dispatcher
            .notify(NewNotification::new(
                requester_id,
                requester_id,
                NotificationKind::FriendRequestSent,
                format!("You sent a friend request to {}", target.username),
            ))
            .await?;

        let auto_accepted = self.auto_responder.should_auto_accept(&target);
        if auto_accepted {
            tracing::info!(target_id = %target_id, "auto-responder accepting friend request");
            self.accept_between(&requester, &target).await?;
        }

        Ok(FriendRequestOutcome {
            request,
            auto_accepted,
        })
    }

    /// `accepter_id` accepts the pending request sent by `requester_id`
    pub async fn accept(&self, accepter_id: Uuid, requester_id: Uuid) -> Result<()> {
        let accepter = require_user(self.users.as_ref(), accepter_id, "User not found").await?;
        let requester = require_user(self.users.as_ref(), requester_id, "Sender not found").await?;
        self.accept_between(&requester, &accepter).await
    }

    async fn accept_between(&self, requester: &User, accepter: &User) -> Result<()> {
        if !self
            .friendships
            .accept_request(requester.id, accepter.id)
            .await?
        {
            return Err(AppError::not_found(
                "Friend request not found or already processed",
            ));
        }
        tracing::info!(
            requester_id = %requester.id,
            accepter_id = %accepter.id,
            "friend request accepted"
        );

        self.dispatcher
            .notify(NewNotification::new(
                requester.id,
                accepter.id,
                NotificationKind::FriendAccepted,
                format!("{} accepted your friend request", accepter.username),
            ))
            .await?;
        self.dispatcher
            .notify(NewNotification::new(
                accepter.id,
                accepter.id,
                NotificationKind::FriendAccepted,
                format!("You accepted {}'s friend request", requester.username),
            ))
            .await?;

        self.router
            .send_to_user(
                requester.id,
                ServerEvent::NewFriendAccepted {
                    user_id: requester.id,
                    friend_id: accepter.id,
                },
            )
            .await;
        self.router
            .send_to_user(
                accepter.id,
                ServerEvent::NewFriendAccepted {
                    user_id: accepter.id,
                    friend_id: requester.id,
                },
            )
            .await;
        Ok(())
    }

    /// Deletes a pending request; accepted friendships are out of reach
    pub async fn reject(&self, request_id: Uuid) -> Result<()> {
        let removed = self
            .friendships
            .delete_pending(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Request not found"))?;

        tracing::info!(
            request_id = %request_id,
            requester_id = %removed.requester_id,
            target_id = %removed.target_id,
            "friend request rejected"
        );
        Ok(())
    }

    pub async fn pending_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequestView>> {
        self.friendships.pending_for(user_id).await
    }

    pub async fn friends(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        self.friendships.friends_of(user_id).await
    }

    pub async fn suggestions(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        self.friendships
            .suggestions(user_id, self.suggestion_limit)
            .await
    }
}
