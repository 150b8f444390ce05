use super::CheckoutBackend;
use crate::error::{AppError, AppResult};
use crate::models::{
    CashPaymentRequest, CashPaymentResponse, CreateOrderRequest, EmailNotificationRequest,
    EmailSendResponse, MobileMoneyPaymentRequest, MobileMoneyPaymentResponse, OrderResponse,
    PaymentStatusResponse, PickupLocationResponse,
};
use crate::services::{
    NotificationService, OrderService, PaymentService, PickupLocationService,
};
use crate::utils::AuthUser;
use async_trait::async_trait;
use uuid::Uuid;

/// Runs checkout against the services directly, as the given buyer.
#[derive(Clone)]
pub struct LocalCheckoutBackend {
    user: Option<AuthUser>,
    orders: OrderService,
    payments: PaymentService,
    pickups: PickupLocationService,
    notifications: NotificationService,
}

impl LocalCheckoutBackend {
    pub fn new(
        user: Option<AuthUser>,
        orders: OrderService,
        payments: PaymentService,
        pickups: PickupLocationService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            user,
            orders,
            payments,
            pickups,
            notifications,
        }
    }

    fn user(&self) -> AppResult<&AuthUser> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))
    }
}

#[async_trait]
impl CheckoutBackend for LocalCheckoutBackend {
    fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    async fn pickup_locations(&self) -> AppResult<Vec<PickupLocationResponse>> {
        self.pickups.list_active().await
    }

    async fn create_order(&self, request: CreateOrderRequest) -> AppResult<OrderResponse> {
        self.orders.create_order(self.user()?.id, request).await
    }

    async fn pay_mobile_money(
        &self,
        request: MobileMoneyPaymentRequest,
    ) -> AppResult<MobileMoneyPaymentResponse> {
        self.payments
            .dispatch_mobile_money(self.user()?, request)
            .await
    }

    async fn pay_cash(&self, request: CashPaymentRequest) -> AppResult<CashPaymentResponse> {
        self.payments.dispatch_cash(self.user()?, request).await
    }

    async fn payment_status(&self, payment_id: Uuid) -> AppResult<PaymentStatusResponse> {
        self.payments
            .get_payment_status(self.user()?, payment_id)
            .await
    }

    async fn send_email(&self, request: EmailNotificationRequest) -> AppResult<EmailSendResponse> {
        self.notifications
            .send_order_email(self.user()?, request)
            .await
    }
}
