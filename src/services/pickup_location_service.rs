use crate::entities::pickup_location_entity as locations;
use crate::error::AppResult;
use crate::models::PickupLocationResponse;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct PickupLocationService {
    pool: DatabaseConnection,
}

impl PickupLocationService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Active pickup locations, alphabetically.
    pub async fn list_active(&self) -> AppResult<Vec<PickupLocationResponse>> {
        let list = locations::Entity::find()
            .filter(locations::Column::IsActive.eq(true))
            .order_by_asc(locations::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }
}

/// Look up a location that can still be chosen at checkout.
pub async fn find_active_location<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<Option<locations::Model>> {
    let location = locations::Entity::find_by_id(id)
        .filter(locations::Column::IsActive.eq(true))
        .one(conn)
        .await?;
    Ok(location)
}
