use crate::entities::pickup_location_entity;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PickupLocationResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub hours: Option<String>,
    pub phone: Option<String>,
}

impl From<pickup_location_entity::Model> for PickupLocationResponse {
    fn from(m: pickup_location_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            address: m.address,
            city: m.city,
            hours: m.hours,
            phone: m.phone,
        }
    }
}

/// The slice of a pickup location echoed back to a cash-on-pickup buyer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PickupDetails {
    pub name: String,
    pub address: String,
    pub hours: Option<String>,
}

impl From<pickup_location_entity::Model> for PickupDetails {
    fn from(m: pickup_location_entity::Model) -> Self {
        Self {
            name: m.name,
            address: format!("{}, {}", m.address, m.city),
            hours: m.hours,
        }
    }
}
