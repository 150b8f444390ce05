use crate::config::PaymentConfig;
use crate::entities::{
    DeliveryMethod, OrderStatus, PaymentProvider, PaymentStatus, order_entity as orders,
    payment_entity as payments, pickup_location_entity as locations,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CashPaymentRequest, CashPaymentResponse, MobileMoneyPaymentRequest,
    MobileMoneyPaymentResponse, PaymentStatusResponse, PickupDetails, SettlementOutcome,
};
use crate::utils::{
    AuthUser, CASH_PREFIX, MOBILE_MONEY_PREFIX, format_ug_phone, generate_transaction_ref,
    validate_ug_phone,
};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

/// Formats an amount as `UGX 115,000`.
pub fn format_amount(currency: &str, amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{currency} {sign}{grouped}")
}

#[derive(Clone)]
pub struct PaymentService {
    pool: DatabaseConnection,
    config: PaymentConfig,
    currency: String,
}

impl PaymentService {
    pub fn new(pool: DatabaseConnection, config: PaymentConfig, currency: String) -> Self {
        Self {
            pool,
            config,
            currency,
        }
    }

    /// Webhooks are refused outright while no secret is configured.
    pub fn verify_webhook_secret(&self, provided: &str) -> bool {
        !self.config.webhook_secret.is_empty() && provided == self.config.webhook_secret
    }

    async fn load_owned_order(&self, caller: &AuthUser, order_id: Uuid) -> AppResult<orders::Model> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.buyer_id != caller.id {
            return Err(AppError::Forbidden);
        }

        Ok(order)
    }

    fn check_amount(order: &orders::Model, amount: i64) -> AppResult<()> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }
        if amount != order.total_amount {
            return Err(AppError::ValidationError(format!(
                "Payment amount {} does not match order total {}",
                amount, order.total_amount
            )));
        }
        Ok(())
    }

    /// Only orders still awaiting payment can take one.
    fn check_payable(order: &orders::Model) -> AppResult<()> {
        if order.status != OrderStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Order is already {}",
                order.status
            )));
        }
        Ok(())
    }

    /// Start a mobile-money collection.
    ///
    /// The payment row is left in `processing` and the call returns at once.
    /// Completion arrives later, either from the local settlement task or the
    /// provider webhook. Repeated calls create repeated payment rows.
    pub async fn dispatch_mobile_money(
        &self,
        caller: &AuthUser,
        request: MobileMoneyPaymentRequest,
    ) -> AppResult<MobileMoneyPaymentResponse> {
        validate_ug_phone(&request.phone_number)?;
        let order = self.load_owned_order(caller, request.order_id).await?;
        Self::check_payable(&order)?;
        Self::check_amount(&order, request.amount)?;

        let phone = format_ug_phone(&request.phone_number);
        let provider: PaymentProvider = request.provider.into();
        let transaction_ref = generate_transaction_ref(MOBILE_MONEY_PREFIX);
        let now = Utc::now();

        let payment = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            amount: Set(request.amount),
            provider: Set(provider),
            phone_number: Set(Some(phone.clone())),
            transaction_ref: Set(transaction_ref.clone()),
            status: Set(PaymentStatus::Pending),
            customer_name: Set(request.customer_name.trim().to_string()),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await?;

        let mut active = payment.into_active_model();
        active.status = Set(PaymentStatus::Processing);
        active.updated_at = Set(Utc::now());
        let payment = active.update(&self.pool).await?;

        log::info!(
            "Mobile money collection {} started for order {} via {} ({})",
            transaction_ref,
            order.id,
            provider,
            phone
        );

        if self.config.simulate_settlement {
            self.schedule_settlement(payment.id);
        }

        Ok(MobileMoneyPaymentResponse {
            success: true,
            payment_id: payment.id,
            transaction_ref,
            message: format!(
                "Payment request sent to {}. Approve the {} prompt on your phone to pay {}.",
                phone,
                provider,
                format_amount(&self.currency, request.amount)
            ),
            provider: request.provider,
        })
    }

    /// Stand-in for the provider callback: completes the payment after the
    /// configured delay on a detached task.
    fn schedule_settlement(&self, payment_id: Uuid) {
        let service = self.clone();
        let delay = std::time::Duration::from_secs(self.config.settlement_delay_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match service
                .settle_mobile_money(payment_id, SettlementOutcome::Completed)
                .await
            {
                Ok(true) => log::info!("Simulated settlement completed payment {payment_id}"),
                Ok(false) => log::debug!("Payment {payment_id} already settled"),
                Err(e) => log::error!("Simulated settlement failed for {payment_id}: {e:?}"),
            }
        });
    }

    /// Apply a settlement outcome to a payment still in flight. Returns `false`
    /// when the payment had already reached a terminal status.
    pub async fn settle_mobile_money(
        &self,
        payment_id: Uuid,
        outcome: SettlementOutcome,
    ) -> AppResult<bool> {
        let txn = self.pool.begin().await?;

        let payment = payments::Entity::find_by_id(payment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        let applied = settle_in(&txn, payment, outcome).await?;
        txn.commit().await?;
        Ok(applied)
    }

    /// Webhook entry point: settle by the provider-facing transaction reference.
    pub async fn settle_by_reference(
        &self,
        transaction_ref: &str,
        outcome: SettlementOutcome,
    ) -> AppResult<bool> {
        let txn = self.pool.begin().await?;

        let payment = payments::Entity::find()
            .filter(payments::Column::TransactionRef.eq(transaction_ref))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        let applied = settle_in(&txn, payment, outcome).await?;
        txn.commit().await?;
        Ok(applied)
    }

    /// Record a cash-on-delivery (or cash-on-pickup) payment and confirm the
    /// order in the same transaction.
    pub async fn dispatch_cash(
        &self,
        caller: &AuthUser,
        request: CashPaymentRequest,
    ) -> AppResult<CashPaymentResponse> {
        let order = self.load_owned_order(caller, request.order_id).await?;
        Self::check_payable(&order)?;
        Self::check_amount(&order, request.amount)?;

        let transaction_ref = generate_transaction_ref(CASH_PREFIX);
        let now = Utc::now();

        let txn = self.pool.begin().await?;

        let payment = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            amount: Set(request.amount),
            provider: Set(PaymentProvider::Cash),
            phone_number: Set(Some(request.customer_phone.trim().to_string())),
            transaction_ref: Set(transaction_ref.clone()),
            status: Set(PaymentStatus::PendingCollection),
            customer_name: Set(request.customer_name.trim().to_string()),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        // Guarded on status so a concurrent cancel or payment is not overwritten
        let confirmed = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(OrderStatus::Confirmed))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .exec(&txn)
            .await?;
        if confirmed.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Order is no longer awaiting payment".to_string(),
            ));
        }

        txn.commit().await?;

        if request.delivery_method != order.delivery_method
            || request.pickup_location_id != order.pickup_location_id
        {
            log::warn!(
                "Cash payment for order {} sent delivery details that differ from the order; using the order's",
                order.id
            );
        }

        let order_id = order.id;
        let pickup_details = match (order.delivery_method, order.pickup_location_id) {
            (DeliveryMethod::Pickup, Some(location_id)) => locations::Entity::find_by_id(location_id)
                .one(&self.pool)
                .await?
                .map(PickupDetails::from),
            _ => None,
        };

        let amount_due = format_amount(&self.currency, request.amount);
        let message = match &pickup_details {
            Some(details) => format!(
                "Order confirmed. Pay {} when you collect your order at {}.",
                amount_due, details.name
            ),
            None if order.delivery_method == DeliveryMethod::Pickup => format!(
                "Order confirmed. Pay {amount_due} when you collect your order."
            ),
            None => format!("Order confirmed. Pay {amount_due} to the courier on delivery."),
        };

        log::info!("Cash payment {transaction_ref} recorded, order {order_id} confirmed");

        Ok(CashPaymentResponse {
            success: true,
            payment_id: payment.id,
            transaction_ref,
            message,
            delivery_method: order.delivery_method,
            pickup_details,
            amount_due: request.amount,
        })
    }

    pub async fn get_payment_status(
        &self,
        caller: &AuthUser,
        payment_id: Uuid,
    ) -> AppResult<PaymentStatusResponse> {
        let payment = payments::Entity::find_by_id(payment_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        self.load_owned_order(caller, payment.order_id).await?;
        Ok(payment.into())
    }

    /// Fail mobile-money payments that have been processing longer than
    /// `stale_after_secs`. Returns how many rows were changed.
    pub async fn fail_stale_payments(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::seconds(self.config.stale_after_secs);

        let result = payments::Entity::update_many()
            .col_expr(payments::Column::Status, Expr::value(PaymentStatus::Failed))
            .col_expr(payments::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payments::Column::Status.eq(PaymentStatus::Processing))
            .filter(payments::Column::Provider.is_in([PaymentProvider::Mtn, PaymentProvider::Airtel]))
            .filter(payments::Column::CreatedAt.lt(cutoff))
            .exec(&self.pool)
            .await?;

        Ok(result.rows_affected)
    }
}

async fn settle_in<C: ConnectionTrait>(
    conn: &C,
    payment: payments::Model,
    outcome: SettlementOutcome,
) -> AppResult<bool> {
    if !matches!(
        payment.status,
        PaymentStatus::Pending | PaymentStatus::Processing
    ) {
        return Ok(false);
    }

    let order_id = payment.order_id;
    let transaction_ref = payment.transaction_ref.clone();
    let now = Utc::now();

    let mut active = payment.into_active_model();
    match outcome {
        SettlementOutcome::Completed => {
            active.status = Set(PaymentStatus::Completed);
            active.completed_at = Set(Some(now));
        }
        SettlementOutcome::Failed => {
            active.status = Set(PaymentStatus::Failed);
        }
    }
    active.updated_at = Set(now);
    active.update(conn).await?;

    if outcome == SettlementOutcome::Completed {
        let order = orders::Entity::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        // Only a pending order is confirmed; later states came from an admin
        if order.status == OrderStatus::Pending {
            let mut active_order = order.into_active_model();
            active_order.status = Set(OrderStatus::Confirmed);
            active_order.updated_at = Set(now);
            active_order.update(conn).await?;
        }
        log::info!("Payment {transaction_ref} completed, order {order_id} confirmed");
    } else {
        log::warn!("Payment {transaction_ref} failed for order {order_id}");
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::database::test_support::{seed_pickup_location, seed_product, setup_db};
    use crate::entities::PaymentMethod;
    use crate::models::{
        CreateOrderRequest, MobileMoneyProvider, OrderLineRequest, ShippingDetails,
    };
    use crate::services::OrderService;
    use sea_orm::PaginatorTrait;

    fn manual_settlement() -> PaymentConfig {
        PaymentConfig {
            simulate_settlement: false,
            ..PaymentConfig::default()
        }
    }

    async fn place_order(
        pool: &DatabaseConnection,
        buyer: &AuthUser,
        shipping: ShippingDetails,
    ) -> crate::models::OrderResponse {
        let product = seed_product(pool, "Kitenge tote", 50_000, 10).await;
        OrderService::new(pool.clone(), CheckoutConfig::default())
            .create_order(
                buyer.id,
                CreateOrderRequest {
                    idempotency_key: Uuid::new_v4().to_string(),
                    shipping,
                    payment_method: PaymentMethod::MobileMoney,
                    notes: None,
                    items: vec![OrderLineRequest {
                        line_id: Uuid::new_v4(),
                        product_id: product.id,
                        quantity: 2,
                        personalization: None,
                    }],
                },
            )
            .await
            .unwrap()
    }

    fn buyer() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: Some("buyer@example.com".to_string()),
        }
    }

    fn delivery() -> ShippingDetails {
        ShippingDetails {
            delivery_method: DeliveryMethod::Delivery,
            full_name: "Achieng Grace".to_string(),
            phone: "0701234567".to_string(),
            email: None,
            address: Some("Plot 2, Jinja Road".to_string()),
            city: Some("Kampala".to_string()),
            pickup_location_id: None,
        }
    }

    fn momo_request(order_id: Uuid, amount: i64, phone: &str) -> MobileMoneyPaymentRequest {
        MobileMoneyPaymentRequest {
            order_id,
            amount,
            phone_number: phone.to_string(),
            provider: MobileMoneyProvider::Mtn,
            customer_name: "Achieng Grace".to_string(),
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount("UGX", 115_000), "UGX 115,000");
        assert_eq!(format_amount("UGX", 999), "UGX 999");
        assert_eq!(format_amount("UGX", 1_000_000), "UGX 1,000,000");
        assert_eq!(format_amount("UGX", 0), "UGX 0");
    }

    #[tokio::test]
    async fn test_mobile_money_rejects_bad_phone_before_writing() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());

        let err = service
            .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0612345678"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(payments::Entity::find().count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mobile_money_leaves_payment_processing_with_normalized_phone() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());

        let response = service
            .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0772 123 456"))
            .await
            .unwrap();
        assert!(response.success);
        assert!(response.transaction_ref.starts_with("CU-"));
        assert!(response.message.contains("UGX 115,000"));

        let row = payments::Entity::find_by_id(response.payment_id)
            .one(&pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, PaymentStatus::Processing);
        assert_eq!(row.provider, PaymentProvider::Mtn);
        assert_eq!(row.phone_number.as_deref(), Some("+256772123456"));
    }

    #[tokio::test]
    async fn test_repeated_mobile_money_calls_create_distinct_payments() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());

        let first = service
            .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0772123456"))
            .await
            .unwrap();
        let second = service
            .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0772123456"))
            .await
            .unwrap();

        // No idempotency on the dispatcher: each call is a new collection attempt
        assert_ne!(first.transaction_ref, second.transaction_ref);
        assert_ne!(first.payment_id, second.payment_id);
        let rows = payments::Entity::find()
            .filter(payments::Column::OrderId.eq(order.id))
            .count(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_settlement_completes_payment_and_confirms_order_once() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());
        let response = service
            .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0772123456"))
            .await
            .unwrap();

        assert!(
            service
                .settle_mobile_money(response.payment_id, SettlementOutcome::Completed)
                .await
                .unwrap()
        );
        // A late failure report must not undo a completed payment
        assert!(
            !service
                .settle_by_reference(&response.transaction_ref, SettlementOutcome::Failed)
                .await
                .unwrap()
        );

        let status = service
            .get_payment_status(&buyer, response.payment_id)
            .await
            .unwrap();
        assert_eq!(status.status, PaymentStatus::Completed);
        assert!(status.completed_at.is_some());

        let order_row = orders::Entity::find_by_id(order.id)
            .one(&pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order_row.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_failed_settlement_keeps_order_pending() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());
        let response = service
            .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0772123456"))
            .await
            .unwrap();

        service
            .settle_by_reference(&response.transaction_ref, SettlementOutcome::Failed)
            .await
            .unwrap();

        let payment = payments::Entity::find_by_id(response.payment_id)
            .one(&pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        let order_row = orders::Entity::find_by_id(order.id)
            .one(&pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order_row.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_simulated_settlement_runs_in_background() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let config = PaymentConfig {
            simulate_settlement: true,
            settlement_delay_secs: 0,
            ..PaymentConfig::default()
        };
        let service = PaymentService::new(pool.clone(), config, "UGX".into());
        let response = service
            .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0772123456"))
            .await
            .unwrap();

        let mut status = PaymentStatus::Processing;
        for _ in 0..50 {
            status = service
                .get_payment_status(&buyer, response.payment_id)
                .await
                .unwrap()
                .status;
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_cash_pickup_confirms_order_and_returns_location() {
        let pool = setup_db().await;
        let buyer = buyer();
        let location = seed_pickup_location(&pool, "Ntinda Craft Hub", true).await;
        let mut shipping = delivery();
        shipping.delivery_method = DeliveryMethod::Pickup;
        shipping.pickup_location_id = Some(location.id);
        let order = place_order(&pool, &buyer, shipping).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());

        let response = service
            .dispatch_cash(
                &buyer,
                CashPaymentRequest {
                    order_id: order.id,
                    amount: order.total_amount,
                    customer_name: "Achieng Grace".to_string(),
                    customer_phone: "0701234567".to_string(),
                    delivery_method: DeliveryMethod::Pickup,
                    pickup_location_id: Some(location.id),
                },
            )
            .await
            .unwrap();

        assert!(response.transaction_ref.starts_with("COD-"));
        assert_eq!(response.amount_due, 100_000);
        let details = response.pickup_details.unwrap();
        assert_eq!(details.name, "Ntinda Craft Hub");
        assert_eq!(details.address, "Plot 12, Kampala Road, Kampala");
        assert_eq!(details.hours.as_deref(), Some("Mon-Sat 9:00-18:00"));

        let payment = payments::Entity::find_by_id(response.payment_id)
            .one(&pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::PendingCollection);
        assert_eq!(payment.provider, PaymentProvider::Cash);

        let order_row = orders::Entity::find_by_id(order.id)
            .one(&pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order_row.status, OrderStatus::Confirmed);
    }

    fn cash_request(order_id: Uuid, amount: i64) -> CashPaymentRequest {
        CashPaymentRequest {
            order_id,
            amount,
            customer_name: "Achieng Grace".to_string(),
            customer_phone: "0701234567".to_string(),
            delivery_method: DeliveryMethod::Delivery,
            pickup_location_id: None,
        }
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_paid() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        OrderService::new(pool.clone(), CheckoutConfig::default())
            .update_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());

        assert!(matches!(
            service
                .dispatch_cash(&buyer, cash_request(order.id, order.total_amount))
                .await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            service
                .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0772123456"))
                .await,
            Err(AppError::Conflict(_))
        ));

        assert_eq!(payments::Entity::find().count(&pool).await.unwrap(), 0);
        let order_row = orders::Entity::find_by_id(order.id)
            .one(&pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order_row.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_second_cash_payment_is_a_conflict() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());

        service
            .dispatch_cash(&buyer, cash_request(order.id, order.total_amount))
            .await
            .unwrap();
        assert!(matches!(
            service
                .dispatch_cash(&buyer, cash_request(order.id, order.total_amount))
                .await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(payments::Entity::find().count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cash_pickup_details_come_from_the_order() {
        let pool = setup_db().await;
        let buyer = buyer();
        let location = seed_pickup_location(&pool, "Ntinda Craft Hub", true).await;
        let mut shipping = delivery();
        shipping.delivery_method = DeliveryMethod::Pickup;
        shipping.pickup_location_id = Some(location.id);
        let order = place_order(&pool, &buyer, shipping).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());

        // The request claims home delivery; the order row wins
        let response = service
            .dispatch_cash(&buyer, cash_request(order.id, order.total_amount))
            .await
            .unwrap();
        assert_eq!(response.delivery_method, DeliveryMethod::Pickup);
        assert_eq!(response.pickup_details.unwrap().name, "Ntinda Craft Hub");
        assert!(response.message.contains("collect"));
    }

    #[tokio::test]
    async fn test_dispatch_checks_ownership_and_amount() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let service = PaymentService::new(pool.clone(), manual_settlement(), "UGX".into());

        let stranger = AuthUser {
            id: Uuid::new_v4(),
            email: None,
        };
        assert!(matches!(
            service
                .dispatch_mobile_money(&stranger, momo_request(order.id, order.total_amount, "0772123456"))
                .await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            service
                .dispatch_mobile_money(&buyer, momo_request(order.id, 1, "0772123456"))
                .await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service
                .dispatch_mobile_money(&buyer, momo_request(Uuid::new_v4(), 1, "0772123456"))
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_processing_payments_are_failed() {
        let pool = setup_db().await;
        let buyer = buyer();
        let order = place_order(&pool, &buyer, delivery()).await;
        let config = PaymentConfig {
            simulate_settlement: false,
            stale_after_secs: -1,
            ..PaymentConfig::default()
        };
        let service = PaymentService::new(pool.clone(), config, "UGX".into());
        let response = service
            .dispatch_mobile_money(&buyer, momo_request(order.id, order.total_amount, "0772123456"))
            .await
            .unwrap();

        assert_eq!(service.fail_stale_payments().await.unwrap(), 1);
        let status = service
            .get_payment_status(&buyer, response.payment_id)
            .await
            .unwrap();
        assert_eq!(status.status, PaymentStatus::Failed);
        assert_eq!(service.fail_stale_payments().await.unwrap(), 0);
    }
}
