use super::{require_user, required, NotificationDispatcher};
use crate::error::{AppError, Result};
use crate::models::{
    Group, GroupMember, GroupRole, GroupView, NewGroup, NewNotification, NotificationKind,
    NotificationSubject,
};
use crate::repository::{GroupRepository, UserRepository};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct GroupService {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    dispatcher: NotificationDispatcher,
}

impl GroupService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            users,
            groups,
            dispatcher,
        }
    }

    async fn require_group(&self, group_id: Uuid) -> Result<Group> {
        self.groups
            .find_group(group_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))
    }

    /// The owner becomes the first admin in the same write
    pub async fn create(
        &self,
        owner_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Group> {
        const MISSING: &str = "Name, description, and user_id are required";
        let name = required(name, MISSING)?;
        let description = required(description, MISSING)?;
        require_user(self.users.as_ref(), owner_id, "User not found").await?;

        let group = self
            .groups
            .create_with_admin(NewGroup {
                name: name.to_string(),
                description: description.to_string(),
                owner_id,
            })
            .await?;
        tracing::info!(group_id = %group.id, owner_id = %owner_id, "group created");

        self.dispatcher
            .notify(
                NewNotification::new(
                    owner_id,
                    owner_id,
                    NotificationKind::GroupCreated,
                    format!("You created the group {}", group.name),
                )
                .about(NotificationSubject::Group(group.id)),
            )
            .await?;
        Ok(group)
    }

    pub async fn join(&self, user_id: Uuid, group_id: Uuid) -> Result<()> {
        require_user(self.users.as_ref(), user_id, "User not found").await?;
        self.require_group(group_id).await?;

        if self.groups.membership_role(group_id, user_id).await?.is_some() {
            return Err(AppError::conflict("Already joined this group"));
        }
        self.groups
            .add_member(group_id, user_id, GroupRole::Member)
            .await?;
        tracing::info!(group_id = %group_id, user_id = %user_id, "user joined group");

        self.dispatcher
            .notify(
                NewNotification::new(
                    user_id,
                    user_id,
                    NotificationKind::GroupJoined,
                    "You joined a group",
                )
                .about(NotificationSubject::Group(group_id)),
            )
            .await?;
        Ok(())
    }

    /// Admins only; the invitee is added as a member right away
    pub async fn invite(&self, inviter_id: Uuid, invitee_id: Uuid, group_id: Uuid) -> Result<()> {
        self.require_group(group_id).await?;

        if self.groups.membership_role(group_id, inviter_id).await? != Some(GroupRole::Admin) {
            return Err(AppError::Forbidden(
                "Only group admins can invite members".to_string(),
            ));
        }
        let inviter = require_user(self.users.as_ref(), inviter_id, "User not found").await?;
        require_user(self.users.as_ref(), invitee_id, "User not found").await?;

        if self
            .groups
            .membership_role(group_id, invitee_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("User already in group"));
        }
        self.groups
            .add_member(group_id, invitee_id, GroupRole::Member)
            .await?;
        tracing::info!(
            group_id = %group_id,
            inviter_id = %inviter_id,
            invitee_id = %invitee_id,
            "user invited to group"
        );

        self.dispatcher
            .notify(
                NewNotification::new(
                    invitee_id,
                    inviter_id,
                    NotificationKind::GroupInvite,
                    format!("{} invited you to a group", inviter.username),
                )
                .about(NotificationSubject::Group(group_id)),
            )
            .await?;
        Ok(())
    }

    pub async fn groups_for(&self, user_id: Uuid) -> Result<Vec<GroupView>> {
        self.groups.groups_for(user_id).await
    }

    pub async fn members(&self, group_id: Uuid) -> Result<Vec<GroupMember>> {
        self.require_group(group_id).await?;
        self.groups.members(group_id).await
    }
}
