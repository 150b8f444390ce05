use crate::entities::{DeliveryMethod, OrderStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Confirmation,
    StatusUpdate,
    Shipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmailLineItem {
    pub name: String,
    pub quantity: i32,
    pub price: i64,
}

/// Fields beyond `type`, `email` and `orderId` are only read by the
/// template that needs them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailNotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub email: Option<String>,
    pub customer_name: Option<String>,
    pub order_id: Option<Uuid>,
    pub items: Option<Vec<EmailLineItem>>,
    pub total: Option<i64>,
    pub shipping_address: Option<String>,
    pub delivery_method: Option<DeliveryMethod>,
    pub new_status: Option<OrderStatus>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EmailSendResponse {
    pub id: String,
}
