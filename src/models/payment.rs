use crate::entities::{DeliveryMethod, PaymentProvider, PaymentStatus, payment_entity};
use crate::models::PickupDetails;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Mobile-money networks; cash is dispatched through its own endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MobileMoneyProvider {
    Mtn,
    Airtel,
}

impl From<MobileMoneyProvider> for PaymentProvider {
    fn from(p: MobileMoneyProvider) -> Self {
        match p {
            MobileMoneyProvider::Mtn => PaymentProvider::Mtn,
            MobileMoneyProvider::Airtel => PaymentProvider::Airtel,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MobileMoneyPaymentRequest {
    pub order_id: Uuid,
    #[schema(example = 115000)]
    pub amount: i64,
    #[schema(example = "0772123456")]
    pub phone_number: String,
    pub provider: MobileMoneyProvider,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MobileMoneyPaymentResponse {
    pub success: bool,
    pub payment_id: Uuid,
    #[schema(example = "CU-1736937600000-K3F9QZ")]
    pub transaction_ref: String,
    pub message: String,
    pub provider: MobileMoneyProvider,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashPaymentRequest {
    pub order_id: Uuid,
    pub amount: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub pickup_location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashPaymentResponse {
    pub success: bool,
    pub payment_id: Uuid,
    #[schema(example = "COD-1736937600000-8HD2LM")]
    pub transaction_ref: String,
    pub message: String,
    pub delivery_method: DeliveryMethod,
    pub pickup_details: Option<PickupDetails>,
    pub amount_due: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    pub transaction_ref: String,
    pub amount: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<payment_entity::Model> for PaymentStatusResponse {
    fn from(m: payment_entity::Model) -> Self {
        Self {
            id: m.id,
            order_id: m.order_id,
            status: m.status,
            provider: m.provider,
            transaction_ref: m.transaction_ref,
            amount: m.amount,
            completed_at: m.completed_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Completed,
    Failed,
}

/// Callback body posted by the mobile-money provider once a collection settles.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MobileMoneyWebhookRequest {
    pub transaction_ref: String,
    pub status: SettlementOutcome,
}
