use super::corrupt_column;
use crate::error::{map_unique, Result};
use crate::models::{Group, GroupMember, GroupRole, GroupView, NewGroup};
use crate::repository::GroupRepository;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    username: String,
    name: String,
    profile_picture: Option<String>,
    role: String,
}

impl MemberRow {
    fn into_member(self) -> Result<GroupMember> {
        let role = GroupRole::parse(&self.role).ok_or_else(|| corrupt_column("role", &self.role))?;
        Ok(GroupMember {
            id: self.id,
            username: self.username,
            name: self.name,
            profile_picture: self.profile_picture,
            role,
        })
    }
}

#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create_with_admin(&self, new_group: NewGroup) -> Result<Group> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO user_groups (id, name, description, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, owner_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_group.name)
        .bind(&new_group.description)
        .bind(new_group.owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO group_memberships (id, group_id, user_id, role)
            VALUES ($1, $2, $3, 'admin')
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(group.id)
        .bind(new_group.owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(group)
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, description, owner_id, created_at FROM user_groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn membership_role(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<GroupRole>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM group_memberships WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        role.map(|r| GroupRole::parse(&r).ok_or_else(|| corrupt_column("role", &r)))
            .transpose()
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid, role: GroupRole) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO group_memberships (id, group_id, user_id, role)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "User is already a member of this group"))?;

        Ok(())
    }

    async fn groups_for(&self, user_id: Uuid) -> Result<Vec<GroupView>> {
        let groups = sqlx::query_as::<_, GroupView>(
            r#"
            SELECT g.id, g.name, g.description, g.owner_id, g.created_at,
                   u.username AS owner_username
            FROM user_groups g
            JOIN group_memberships m ON m.group_id = g.id
            JOIN users u ON u.id = g.owner_id
            WHERE m.user_id = $1
            ORDER BY g.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn members(&self, group_id: Uuid) -> Result<Vec<GroupMember>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT u.id, u.username, u.name, u.profile_picture, m.role
            FROM group_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MemberRow::into_member).collect()
    }
}
