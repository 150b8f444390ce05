use crate::entities::{AppRole, user_role_entity as roles};
use crate::error::{AppError, AppResult};
use crate::utils::AuthUser;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

/// Role lookups against the `user_roles` table.
#[derive(Clone)]
pub struct RoleService {
    pool: DatabaseConnection,
}

impl RoleService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn has_role(&self, user_id: Uuid, role: AppRole) -> AppResult<bool> {
        let count = roles::Entity::find()
            .filter(roles::Column::UserId.eq(user_id))
            .filter(roles::Column::Role.eq(role))
            .count(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn is_admin(&self, user_id: Uuid) -> AppResult<bool> {
        self.has_role(user_id, AppRole::Admin).await
    }

    pub async fn require_admin(&self, user: &AuthUser) -> AppResult<()> {
        if self.is_admin(user.id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}
