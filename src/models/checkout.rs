use crate::entities::{DeliveryMethod, PaymentMethod};
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

/// Contact and destination details gathered in the shipping step.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub delivery_method: DeliveryMethod,
    #[schema(example = "Nakato Sarah")]
    pub full_name: String,
    #[schema(example = "0772123456")]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub pickup_location_id: Option<Uuid>,
}

impl ShippingDetails {
    pub fn validate(&self) -> AppResult<()> {
        if self.full_name.trim().is_empty() || self.phone.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Please fill in your name and phone number".to_string(),
            ));
        }

        match self.delivery_method {
            DeliveryMethod::Delivery => {
                if is_blank(&self.address) || is_blank(&self.city) {
                    return Err(AppError::ValidationError(
                        "Please provide a delivery address and city".to_string(),
                    ));
                }
            }
            DeliveryMethod::Pickup => {
                if self.pickup_location_id.is_none() {
                    return Err(AppError::ValidationError(
                        "Please select a pickup location".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    /// Client-assigned id that ties a personalization note to its order item.
    pub line_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub personalization: Option<String>,
}

/// Everything needed to place an order in one atomic call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[schema(example = "6f1c1f0e-8c1e-4a55-9d8e-2b1b4d0d9a11")]
    pub idempotency_key: String,
    pub shipping: ShippingDetails,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> AppResult<()> {
        let key = self.idempotency_key.trim();
        if key.is_empty() || key.len() > 64 {
            return Err(AppError::ValidationError(
                "Idempotency key must be 1-64 characters".to_string(),
            ));
        }

        self.shipping.validate()?;

        if self.items.is_empty() {
            return Err(AppError::ValidationError("Your cart is empty".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for line in &self.items {
            if line.quantity < 1 {
                return Err(AppError::ValidationError(
                    "Item quantity must be at least 1".to_string(),
                ));
            }
            if !seen.insert(line.line_id) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate line id {}",
                    line.line_id
                )));
            }
        }

        Ok(())
    }

    /// md5 over the parts of the request that shape the order: lines,
    /// shipping, payment method and notes. The idempotency key is left out
    /// so a replay can be checked against the request that created the order.
    pub fn fingerprint(&self) -> String {
        let mut lines: Vec<&OrderLineRequest> = self.items.iter().collect();
        lines.sort_by_key(|line| line.line_id);

        let trimmed = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let shipping = &self.shipping;
        let (address, city, pickup_location_id) = match shipping.delivery_method {
            DeliveryMethod::Delivery => (trimmed(&shipping.address), trimmed(&shipping.city), None),
            DeliveryMethod::Pickup => (None, None, shipping.pickup_location_id),
        };

        let canonical = serde_json::json!({
            "lines": lines
                .iter()
                .map(|line| serde_json::json!([
                    line.line_id,
                    line.product_id,
                    line.quantity,
                    trimmed(&line.personalization),
                ]))
                .collect::<Vec<_>>(),
            "deliveryMethod": shipping.delivery_method,
            "fullName": shipping.full_name.trim(),
            "phone": shipping.phone.trim(),
            "address": address,
            "city": city,
            "pickupLocationId": pickup_location_id,
            "paymentMethod": self.payment_method,
            "notes": trimmed(&self.notes),
        });
        format!("{:x}", md5::compute(canonical.to_string()))
    }
}
