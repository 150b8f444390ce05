use crate::entities::{
    DeliveryMethod, OrderStatus, PaymentMethod, order_entity, order_item_entity,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub line_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: i64,
}

impl From<order_item_entity::Model> for OrderItemResponse {
    fn from(m: order_item_entity::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            line_id: m.line_id,
            quantity: m.quantity,
            unit_price: m.unit_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub shipping_cost: i64,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub pickup_location_id: Option<Uuid>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    /// True when this response replays an order created by an earlier
    /// request carrying the same idempotency key.
    #[serde(default)]
    pub replayed: bool,
}

impl OrderResponse {
    pub fn from_parts(order: order_entity::Model, items: Vec<order_item_entity::Model>) -> Self {
        Self {
            id: order.id,
            status: order.status,
            total_amount: order.total_amount,
            shipping_cost: order.shipping_cost,
            delivery_method: order.delivery_method,
            payment_method: order.payment_method,
            pickup_location_id: order.pickup_location_id,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at,
            replayed: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    /// Send the buyer a status email after the update.
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}
