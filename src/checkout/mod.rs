//! Buyer-side checkout: shipping → payment → processing → success.
//!
//! `CheckoutFlow` drives a [`CheckoutBackend`], either the HTTP API or the
//! services in-process. A mobile-money payment is only reported successful
//! once the backend shows it completed; the flow polls for that with a
//! bounded timeout.

mod http;
mod local;

pub use http::HttpCheckoutBackend;
pub use local::LocalCheckoutBackend;

use crate::cart::{CartStorage, CartStore};
use crate::entities::{PaymentMethod, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::models::{
    CashPaymentRequest, CashPaymentResponse, CreateOrderRequest, EmailLineItem,
    EmailNotificationRequest, EmailSendResponse, MobileMoneyPaymentRequest,
    MobileMoneyPaymentResponse, MobileMoneyProvider, NotificationType, OrderLineRequest,
    OrderResponse, PaymentStatusResponse, PickupLocationResponse, ShippingDetails,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    /// Whether requests will carry a signed-in buyer's credentials.
    fn is_authenticated(&self) -> bool;

    async fn pickup_locations(&self) -> AppResult<Vec<PickupLocationResponse>>;

    async fn create_order(&self, request: CreateOrderRequest) -> AppResult<OrderResponse>;

    async fn pay_mobile_money(
        &self,
        request: MobileMoneyPaymentRequest,
    ) -> AppResult<MobileMoneyPaymentResponse>;

    async fn pay_cash(&self, request: CashPaymentRequest) -> AppResult<CashPaymentResponse>;

    async fn payment_status(&self, payment_id: Uuid) -> AppResult<PaymentStatusResponse>;

    async fn send_email(&self, request: EmailNotificationRequest) -> AppResult<EmailSendResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Shipping,
    Payment,
    Processing,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentChoice {
    MobileMoney {
        provider: MobileMoneyProvider,
        phone_number: String,
    },
    Cash,
}

impl PaymentChoice {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentChoice::MobileMoney { .. } => PaymentMethod::MobileMoney,
            PaymentChoice::Cash => PaymentMethod::Cash,
        }
    }
}

/// What the current idempotency key was last sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Submission {
    payment_method: PaymentMethod,
    lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct CheckoutFlow<B: CheckoutBackend> {
    backend: B,
    poll: PollSettings,
    step: CheckoutStep,
    shipping: Option<ShippingDetails>,
    idempotency_key: Option<String>,
    submitted: Option<Submission>,
    last_error: Option<String>,
    order: Option<OrderResponse>,
}

impl<B: CheckoutBackend> CheckoutFlow<B> {
    pub fn new(backend: B, poll: PollSettings) -> Self {
        Self {
            backend,
            poll,
            step: CheckoutStep::Shipping,
            shipping: None,
            idempotency_key: None,
            submitted: None,
            last_error: None,
            order: None,
        }
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    /// Message from the last failed submission, for display.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The order placed by a successful checkout.
    pub fn order(&self) -> Option<&OrderResponse> {
        self.order.as_ref()
    }

    pub fn shipping(&self) -> Option<&ShippingDetails> {
        self.shipping.as_ref()
    }

    /// Active pickup points to offer in the shipping step.
    pub async fn pickup_locations(&self) -> AppResult<Vec<PickupLocationResponse>> {
        self.backend.pickup_locations().await
    }

    /// Validate shipping details and move to the payment step. Nothing is
    /// sent to the backend.
    pub fn submit_shipping(&mut self, details: ShippingDetails) -> AppResult<()> {
        if self.step != CheckoutStep::Shipping {
            return Err(AppError::Conflict(
                "Shipping details can only be changed in the shipping step".to_string(),
            ));
        }
        details.validate()?;
        self.shipping = Some(details);
        self.last_error = None;
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Return to the shipping step. Any order placed so far belongs to the
    /// old details, so the next submission starts a fresh one.
    pub fn back_to_shipping(&mut self) -> AppResult<()> {
        if self.step != CheckoutStep::Payment {
            return Err(AppError::Conflict(
                "Can only go back to shipping from the payment step".to_string(),
            ));
        }
        self.reset_key();
        self.step = CheckoutStep::Shipping;
        Ok(())
    }

    fn reset_key(&mut self) {
        self.idempotency_key = None;
        self.submitted = None;
    }

    /// Create the order, dispatch the payment and, for mobile money, wait for
    /// it to settle.
    ///
    /// On failure the flow returns to the payment step with the error kept
    /// for display. The idempotency key survives, so submitting the same
    /// cart with the same payment method again reuses the order already
    /// created. A different payment method or changed cart lines get a new
    /// key and a new order.
    pub async fn place_order<S: CartStorage>(
        &mut self,
        cart: &mut CartStore<S>,
        payment: PaymentChoice,
    ) -> AppResult<OrderResponse> {
        if self.step != CheckoutStep::Payment {
            return Err(AppError::Conflict(
                "Checkout is not waiting for payment".to_string(),
            ));
        }

        let shipping = match self.preflight(cart) {
            Ok(shipping) => shipping,
            Err(e) => {
                self.last_error = Some(e.user_message());
                return Err(e);
            }
        };

        let submission = Submission {
            payment_method: payment.method(),
            lines: cart.order_lines(),
        };
        if self.submitted.as_ref() != Some(&submission) {
            if self.idempotency_key.is_some() {
                log::info!("Checkout details changed since the last attempt, starting a new order");
            }
            self.reset_key();
        }
        let key = self
            .idempotency_key
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        self.submitted = Some(submission);

        self.step = CheckoutStep::Processing;
        self.last_error = None;

        match self.submit(cart, &shipping, &key, &payment).await {
            Ok(order) => {
                self.notify_confirmation(cart, &shipping, &order).await;
                cart.clear();
                self.reset_key();
                self.order = Some(order.clone());
                self.step = CheckoutStep::Success;
                Ok(order)
            }
            Err(e) => {
                log::warn!("Checkout failed: {e}");
                self.last_error = Some(e.user_message());
                self.step = CheckoutStep::Payment;
                Err(e)
            }
        }
    }

    fn preflight<S: CartStorage>(&self, cart: &CartStore<S>) -> AppResult<ShippingDetails> {
        if !self.backend.is_authenticated() {
            return Err(AppError::AuthError(
                "Please sign in to place your order".to_string(),
            ));
        }
        let shipping = self.shipping.clone().ok_or_else(|| {
            AppError::ValidationError("Please enter your shipping details".to_string())
        })?;
        shipping.validate()?;
        if cart.is_empty() {
            return Err(AppError::ValidationError("Your cart is empty".to_string()));
        }
        Ok(shipping)
    }

    async fn submit<S: CartStorage>(
        &self,
        cart: &CartStore<S>,
        shipping: &ShippingDetails,
        key: &str,
        payment: &PaymentChoice,
    ) -> AppResult<OrderResponse> {
        let order = self
            .backend
            .create_order(CreateOrderRequest {
                idempotency_key: key.to_string(),
                shipping: shipping.clone(),
                payment_method: payment.method(),
                notes: None,
                items: cart.order_lines(),
            })
            .await?;

        match payment {
            PaymentChoice::MobileMoney {
                provider,
                phone_number,
            } => {
                let dispatched = self
                    .backend
                    .pay_mobile_money(MobileMoneyPaymentRequest {
                        order_id: order.id,
                        amount: order.total_amount,
                        phone_number: phone_number.clone(),
                        provider: *provider,
                        customer_name: shipping.full_name.clone(),
                    })
                    .await?;
                log::info!(
                    "Mobile money request {} sent for order {}",
                    dispatched.transaction_ref,
                    order.id
                );
                self.wait_for_settlement(dispatched.payment_id).await?;
            }
            PaymentChoice::Cash => {
                self.backend
                    .pay_cash(CashPaymentRequest {
                        order_id: order.id,
                        amount: order.total_amount,
                        customer_name: shipping.full_name.clone(),
                        customer_phone: shipping.phone.clone(),
                        delivery_method: shipping.delivery_method,
                        pickup_location_id: shipping.pickup_location_id,
                    })
                    .await?;
            }
        }

        Ok(order)
    }

    async fn wait_for_settlement(&self, payment_id: Uuid) -> AppResult<()> {
        let deadline = Instant::now() + self.poll.timeout;
        loop {
            let payment = self.backend.payment_status(payment_id).await?;
            match payment.status {
                PaymentStatus::Completed => return Ok(()),
                PaymentStatus::Failed => {
                    return Err(AppError::ExternalApiError(
                        "Mobile money payment was declined or cancelled".to_string(),
                    ));
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(AppError::ExternalApiError(
                    "Timed out waiting for mobile money confirmation. Check your phone and try again."
                        .to_string(),
                ));
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }

    async fn notify_confirmation<S: CartStorage>(
        &self,
        cart: &CartStore<S>,
        shipping: &ShippingDetails,
        order: &OrderResponse,
    ) {
        let Some(email) = shipping.email.clone().filter(|e| !e.trim().is_empty()) else {
            return;
        };

        let shipping_address = match (&shipping.address, &shipping.city) {
            (Some(address), Some(city)) => Some(format!("{address}, {city}")),
            _ => None,
        };

        let request = EmailNotificationRequest {
            notification_type: Some(NotificationType::Confirmation),
            email: Some(email),
            customer_name: Some(shipping.full_name.clone()),
            order_id: Some(order.id),
            items: Some(email_lines(cart, order)),
            total: Some(order.total_amount),
            shipping_address,
            delivery_method: Some(shipping.delivery_method),
            ..Default::default()
        };

        if let Err(e) = self.backend.send_email(request).await {
            log::warn!("Confirmation email for order {} not sent: {e}", order.id);
        }
    }
}

/// Email rows priced from the order, which holds the server's prices. The
/// cart only supplies display names.
fn email_lines<S: CartStorage>(cart: &CartStore<S>, order: &OrderResponse) -> Vec<EmailLineItem> {
    order
        .items
        .iter()
        .map(|item| {
            let name = cart
                .items()
                .iter()
                .find(|c| Some(c.line_id) == item.line_id)
                .or_else(|| cart.items().iter().find(|c| c.product.id == item.product_id))
                .map(|c| c.product.name.clone())
                .unwrap_or_else(|| "Item".to_string());
            EmailLineItem {
                name,
                quantity: item.quantity,
                price: item.unit_price,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{MemoryCartStorage, ProductSnapshot};
    use crate::entities::{DeliveryMethod, OrderStatus, PaymentProvider};
    use crate::models::OrderItemResponse;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that records calls and reports a fixed payment status.
    struct ScriptedBackend {
        authenticated: bool,
        payment_status: PaymentStatus,
        calls: AtomicUsize,
        order_keys: Mutex<Vec<String>>,
        emails: Mutex<Vec<EmailNotificationRequest>>,
        fail_email: bool,
    }

    impl ScriptedBackend {
        fn new(payment_status: PaymentStatus) -> Self {
            Self {
                authenticated: true,
                payment_status,
                calls: AtomicUsize::new(0),
                order_keys: Mutex::new(Vec::new()),
                emails: Mutex::new(Vec::new()),
                fail_email: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl<'a> CheckoutBackend for &'a ScriptedBackend {
        fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        async fn pickup_locations(&self) -> AppResult<Vec<PickupLocationResponse>> {
            self.hit();
            Ok(Vec::new())
        }

        async fn create_order(&self, request: CreateOrderRequest) -> AppResult<OrderResponse> {
            self.hit();
            self.order_keys
                .lock()
                .unwrap()
                .push(request.idempotency_key.clone());
            Ok(OrderResponse {
                id: Uuid::nil(),
                status: OrderStatus::Pending,
                total_amount: 115_000,
                shipping_cost: 15_000,
                delivery_method: request.shipping.delivery_method,
                payment_method: request.payment_method,
                pickup_location_id: request.shipping.pickup_location_id,
                items: request
                    .items
                    .iter()
                    .map(|line| OrderItemResponse {
                        id: Uuid::new_v4(),
                        product_id: line.product_id,
                        line_id: Some(line.line_id),
                        quantity: line.quantity,
                        unit_price: 50_000,
                    })
                    .collect(),
                created_at: Utc::now(),
                replayed: false,
            })
        }

        async fn pay_mobile_money(
            &self,
            request: MobileMoneyPaymentRequest,
        ) -> AppResult<MobileMoneyPaymentResponse> {
            self.hit();
            Ok(MobileMoneyPaymentResponse {
                success: true,
                payment_id: Uuid::nil(),
                transaction_ref: "CU-1-AAAAAA".to_string(),
                message: "sent".to_string(),
                provider: request.provider,
            })
        }

        async fn pay_cash(&self, request: CashPaymentRequest) -> AppResult<CashPaymentResponse> {
            self.hit();
            Ok(CashPaymentResponse {
                success: true,
                payment_id: Uuid::nil(),
                transaction_ref: "COD-1-AAAAAA".to_string(),
                message: "ok".to_string(),
                delivery_method: request.delivery_method,
                pickup_details: None,
                amount_due: request.amount,
            })
        }

        async fn payment_status(&self, payment_id: Uuid) -> AppResult<PaymentStatusResponse> {
            self.hit();
            Ok(PaymentStatusResponse {
                id: payment_id,
                order_id: Uuid::nil(),
                status: self.payment_status,
                provider: PaymentProvider::Mtn,
                transaction_ref: "CU-1-AAAAAA".to_string(),
                amount: 115_000,
                completed_at: None,
            })
        }

        async fn send_email(
            &self,
            request: EmailNotificationRequest,
        ) -> AppResult<EmailSendResponse> {
            self.hit();
            self.emails.lock().unwrap().push(request);
            if self.fail_email {
                return Err(AppError::NotificationError("provider down".to_string()));
            }
            Ok(EmailSendResponse {
                id: "email_1".to_string(),
            })
        }
    }

    fn fast_poll() -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(40),
        }
    }

    fn cart_with_one_line() -> CartStore<MemoryCartStorage> {
        let mut cart = CartStore::load(MemoryCartStorage::new());
        cart.add_item(
            ProductSnapshot {
                id: Uuid::new_v4(),
                name: "Kitenge tote".to_string(),
                price: 50_000,
                stock_quantity: 5,
                image_url: None,
            },
            2,
        );
        cart
    }

    fn delivery() -> ShippingDetails {
        ShippingDetails {
            delivery_method: DeliveryMethod::Delivery,
            full_name: "Nakato Sarah".to_string(),
            phone: "0772123456".to_string(),
            email: Some("nakato@example.com".to_string()),
            address: Some("Plot 4, Bombo Road".to_string()),
            city: Some("Kampala".to_string()),
            pickup_location_id: None,
        }
    }

    fn momo() -> PaymentChoice {
        PaymentChoice::MobileMoney {
            provider: MobileMoneyProvider::Mtn,
            phone_number: "0772123456".to_string(),
        }
    }

    #[test]
    fn test_pickup_without_location_never_reaches_backend() {
        let backend = ScriptedBackend::new(PaymentStatus::Completed);
        let mut flow = CheckoutFlow::new(&backend, fast_poll());

        let details = ShippingDetails {
            delivery_method: DeliveryMethod::Pickup,
            address: None,
            city: None,
            ..delivery()
        };
        assert!(matches!(
            flow.submit_shipping(details),
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(flow.step(), CheckoutStep::Shipping);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_email_lines_use_order_prices() {
        let cart = cart_with_one_line();
        let line = &cart.items()[0];
        let order = OrderResponse {
            id: Uuid::nil(),
            status: OrderStatus::Confirmed,
            total_amount: 135_000,
            shipping_cost: 15_000,
            delivery_method: DeliveryMethod::Delivery,
            payment_method: PaymentMethod::Cash,
            pickup_location_id: None,
            items: vec![OrderItemResponse {
                id: Uuid::new_v4(),
                product_id: line.product.id,
                line_id: Some(line.line_id),
                quantity: 2,
                unit_price: 60_000,
            }],
            created_at: Utc::now(),
            replayed: false,
        };

        let lines = email_lines(&cart, &order);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Kitenge tote");
        assert_eq!(lines[0].price, 60_000);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_back_to_shipping_only_from_payment() {
        let backend = ScriptedBackend::new(PaymentStatus::Completed);
        let mut flow = CheckoutFlow::new(&backend, fast_poll());
        assert!(flow.back_to_shipping().is_err());

        flow.submit_shipping(delivery()).unwrap();
        assert_eq!(flow.step(), CheckoutStep::Payment);
        flow.back_to_shipping().unwrap();
        assert_eq!(flow.step(), CheckoutStep::Shipping);
    }

    #[tokio::test]
    async fn test_signed_out_buyer_is_stopped_before_any_write() {
        let mut backend = ScriptedBackend::new(PaymentStatus::Completed);
        backend.authenticated = false;
        let mut flow = CheckoutFlow::new(&backend, fast_poll());
        let mut cart = cart_with_one_line();

        flow.submit_shipping(delivery()).unwrap();
        let err = flow.place_order(&mut cart, PaymentChoice::Cash).await.unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
        assert_eq!(flow.step(), CheckoutStep::Payment);
        assert!(flow.last_error().is_some());
        assert_eq!(backend.calls(), 0);
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_failed_payment_returns_to_payment_and_keeps_key() {
        let backend = ScriptedBackend::new(PaymentStatus::Failed);
        let mut flow = CheckoutFlow::new(&backend, fast_poll());
        let mut cart = cart_with_one_line();
        flow.submit_shipping(delivery()).unwrap();

        let err = flow.place_order(&mut cart, momo()).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalApiError(_)));
        assert_eq!(flow.step(), CheckoutStep::Payment);
        assert!(flow.last_error().unwrap().contains("declined"));
        assert!(!cart.is_empty());

        flow.place_order(&mut cart, momo()).await.unwrap_err();
        let keys = backend.order_keys.lock().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], keys[1]);
    }

    #[tokio::test]
    async fn test_changed_details_get_a_new_key() {
        let backend = ScriptedBackend::new(PaymentStatus::Failed);
        let mut flow = CheckoutFlow::new(&backend, fast_poll());
        let mut cart = cart_with_one_line();
        flow.submit_shipping(delivery()).unwrap();

        flow.place_order(&mut cart, momo()).await.unwrap_err();
        // A corrected phone number is the same order
        let other_phone = PaymentChoice::MobileMoney {
            provider: MobileMoneyProvider::Airtel,
            phone_number: "0701234567".to_string(),
        };
        flow.place_order(&mut cart, other_phone).await.unwrap_err();

        let product_id = cart.items()[0].product.id;
        cart.update_quantity(product_id, 1);
        flow.place_order(&mut cart, momo()).await.unwrap_err();

        flow.back_to_shipping().unwrap();
        flow.submit_shipping(delivery()).unwrap();
        flow.place_order(&mut cart, momo()).await.unwrap_err();

        flow.place_order(&mut cart, PaymentChoice::Cash).await.unwrap();

        let keys = backend.order_keys.lock().unwrap();
        assert_eq!(keys.len(), 5);
        assert_eq!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
        assert_ne!(keys[2], keys[3]);
        assert_ne!(keys[3], keys[4]);
    }

    #[tokio::test]
    async fn test_processing_payment_times_out() {
        let backend = ScriptedBackend::new(PaymentStatus::Processing);
        let mut flow = CheckoutFlow::new(&backend, fast_poll());
        let mut cart = cart_with_one_line();
        flow.submit_shipping(delivery()).unwrap();

        let err = flow.place_order(&mut cart, momo()).await.unwrap_err();
        assert!(err.user_message().contains("Timed out"));
        assert_eq!(flow.step(), CheckoutStep::Payment);
    }

    #[tokio::test]
    async fn test_email_failure_does_not_fail_checkout() {
        let mut backend = ScriptedBackend::new(PaymentStatus::Completed);
        backend.fail_email = true;
        let mut flow = CheckoutFlow::new(&backend, fast_poll());
        let mut cart = cart_with_one_line();
        flow.submit_shipping(delivery()).unwrap();

        let order = flow.place_order(&mut cart, momo()).await.unwrap();
        assert_eq!(order.total_amount, 115_000);
        assert_eq!(flow.step(), CheckoutStep::Success);
        assert!(cart.is_empty());
        assert!(flow.order().is_some());
        assert_eq!(backend.emails.lock().unwrap().len(), 1);

        // A finished checkout cannot be submitted again
        assert!(matches!(
            flow.place_order(&mut cart, momo()).await,
            Err(AppError::Conflict(_))
        ));
    }
}
