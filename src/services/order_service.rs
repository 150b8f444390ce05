use crate::config::CheckoutConfig;
use crate::entities::{
    DeliveryMethod, OrderStatus, PersonalizationStatus, order_entity as orders,
    order_item_entity as order_items, personalization_request_entity as personalizations,
    product_entity as products,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateOrderRequest, OrderQuery, OrderResponse, PaginatedResponse, PaginationParams,
};
use crate::services::pickup_location_service::find_active_location;
use crate::utils::AuthUser;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
    checkout: CheckoutConfig,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, checkout: CheckoutConfig) -> Self {
        Self { pool, checkout }
    }

    pub fn shipping_cost(&self, method: DeliveryMethod) -> i64 {
        match method {
            DeliveryMethod::Delivery => self.checkout.delivery_fee,
            DeliveryMethod::Pickup => 0,
        }
    }

    /// Place an order with its items and personalization requests in a single
    /// transaction.
    ///
    /// Prices are snapshotted from the product table, not taken from the
    /// client. A request whose idempotency key was already used by this buyer
    /// returns the original order with `replayed = true` and writes nothing,
    /// provided the request is the same one. A reused key with different
    /// lines, shipping or payment method is a conflict.
    pub async fn create_order(
        &self,
        buyer_id: Uuid,
        request: CreateOrderRequest,
    ) -> AppResult<OrderResponse> {
        request.validate()?;
        let key = request.idempotency_key.trim().to_string();
        let fingerprint = request.fingerprint();

        if let Some(existing) = self.find_by_idempotency_key(buyer_id, &key).await? {
            log::info!("Replaying order {} for idempotency key {key}", existing.id);
            return self.replay(existing, &fingerprint).await;
        }

        match self.insert_order(buyer_id, &key, &fingerprint, &request).await {
            Ok(response) => Ok(response),
            Err(AppError::DatabaseError(err)) => {
                // A concurrent request with the same key may have won the unique index
                if let Some(existing) = self.find_by_idempotency_key(buyer_id, &key).await? {
                    log::warn!("Lost idempotency race for key {key}, replaying {}", existing.id);
                    return self.replay(existing, &fingerprint).await;
                }
                Err(AppError::DatabaseError(err))
            }
            Err(e) => Err(e),
        }
    }

    async fn insert_order(
        &self,
        buyer_id: Uuid,
        key: &str,
        fingerprint: &str,
        request: &CreateOrderRequest,
    ) -> AppResult<OrderResponse> {
        let shipping = &request.shipping;
        let txn = self.pool.begin().await?;

        let pickup_location_id = match shipping.delivery_method {
            DeliveryMethod::Pickup => {
                let id = shipping.pickup_location_id.ok_or_else(|| {
                    AppError::ValidationError("Please select a pickup location".to_string())
                })?;
                find_active_location(&txn, id).await?.ok_or_else(|| {
                    AppError::ValidationError(
                        "The selected pickup location is no longer available".to_string(),
                    )
                })?;
                Some(id)
            }
            DeliveryMethod::Delivery => None,
        };

        let catalog = load_products(&txn, request).await?;

        let mut subtotal: i64 = 0;
        for line in &request.items {
            let product = catalog.get(&line.product_id).ok_or_else(|| {
                AppError::ValidationError(format!("Product {} is not available", line.product_id))
            })?;
            if line.quantity > product.stock_quantity {
                return Err(AppError::ValidationError(format!(
                    "Only {} of \"{}\" left in stock",
                    product.stock_quantity, product.name
                )));
            }
            subtotal = product
                .price
                .checked_mul(i64::from(line.quantity))
                .and_then(|line_total| subtotal.checked_add(line_total))
                .ok_or_else(|| AppError::ValidationError("Order total is too large".to_string()))?;
        }

        let shipping_cost = self.shipping_cost(shipping.delivery_method);
        let now = Utc::now();

        let order = orders::ActiveModel {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(buyer_id),
            status: Set(OrderStatus::Pending),
            total_amount: Set(subtotal + shipping_cost),
            shipping_cost: Set(shipping_cost),
            delivery_method: Set(shipping.delivery_method),
            shipping_name: Set(shipping.full_name.trim().to_string()),
            shipping_phone: Set(shipping.phone.trim().to_string()),
            shipping_address: Set(match shipping.delivery_method {
                DeliveryMethod::Delivery => shipping.address.clone(),
                DeliveryMethod::Pickup => None,
            }),
            shipping_city: Set(match shipping.delivery_method {
                DeliveryMethod::Delivery => shipping.city.clone(),
                DeliveryMethod::Pickup => None,
            }),
            pickup_location_id: Set(pickup_location_id),
            payment_method: Set(request.payment_method),
            notes: Set(request.notes.clone().filter(|n| !n.trim().is_empty())),
            idempotency_key: Set(Some(key.to_string())),
            request_fingerprint: Set(Some(fingerprint.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            // catalog membership was checked above
            let unit_price = catalog[&line.product_id].price;
            let item = order_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                line_id: Set(Some(line.line_id)),
                quantity: Set(line.quantity),
                unit_price: Set(unit_price),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        let item_by_line: HashMap<Uuid, Uuid> = items
            .iter()
            .filter_map(|item| item.line_id.map(|line| (line, item.id)))
            .collect();

        let mut personalization_count = 0;
        for line in &request.items {
            let Some(note) = line
                .personalization
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
            else {
                continue;
            };
            let order_item_id = item_by_line.get(&line.line_id).copied().ok_or_else(|| {
                AppError::InternalError(format!("No order item for line {}", line.line_id))
            })?;
            personalizations::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_item_id: Set(order_item_id),
                description: Set(note.to_string()),
                status: Set(PersonalizationStatus::Pending),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            personalization_count += 1;
        }

        txn.commit().await?;

        log::info!(
            "Order {} placed by {}: {} items, {} personalization requests, total {}",
            order.id,
            buyer_id,
            items.len(),
            personalization_count,
            order.total_amount
        );

        Ok(OrderResponse::from_parts(order, items))
    }

    async fn find_by_idempotency_key(
        &self,
        buyer_id: Uuid,
        key: &str,
    ) -> AppResult<Option<orders::Model>> {
        let order = orders::Entity::find()
            .filter(orders::Column::BuyerId.eq(buyer_id))
            .filter(orders::Column::IdempotencyKey.eq(key))
            .one(&self.pool)
            .await?;
        Ok(order)
    }

    /// Orders stored before fingerprinting carry none and always replay.
    async fn replay(&self, order: orders::Model, fingerprint: &str) -> AppResult<OrderResponse> {
        if order
            .request_fingerprint
            .as_deref()
            .is_some_and(|stored| stored != fingerprint)
        {
            log::warn!(
                "Idempotency key for order {} reused with a different request",
                order.id
            );
            return Err(AppError::Conflict(
                "This checkout was already submitted with different details".to_string(),
            ));
        }

        let mut response = self.with_items(order).await?;
        response.replayed = true;
        Ok(response)
    }

    async fn with_items(&self, order: orders::Model) -> AppResult<OrderResponse> {
        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order.id))
            .order_by_asc(order_items::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    /// Fetch an order visible to `caller` (its buyer).
    pub async fn get_order(&self, caller: &AuthUser, order_id: Uuid) -> AppResult<OrderResponse> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.buyer_id != caller.id {
            return Err(AppError::Forbidden);
        }

        self.with_items(order).await
    }

    pub async fn list_orders(
        &self,
        caller: &AuthUser,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut select = orders::Entity::find().filter(orders::Column::BuyerId.eq(caller.id));
        if let Some(status) = query.status {
            select = select.filter(orders::Column::Status.eq(status));
        }

        let paginator = select
            .order_by_desc(orders::Column::CreatedAt)
            .paginate(&self.pool, params.per_page);
        let total = paginator.num_items().await?;
        let page = paginator.fetch_page(params.page_index()).await?;

        let mut data = Vec::with_capacity(page.len());
        for order in page {
            data.push(self.with_items(order).await?);
        }

        Ok(PaginatedResponse::new(data, params, total))
    }

    /// Move an order to `status`. Delivered and cancelled orders are final.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> AppResult<orders::Model> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if !order.status.can_transition_to(status) {
            return Err(AppError::Conflict(format!(
                "Cannot change order status from {} to {}",
                order.status, status
            )));
        }

        let previous = order.status;
        let mut active = order.into_active_model();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.pool).await?;

        log::info!("Order {order_id} status changed: {previous} -> {status}");
        Ok(updated)
    }
}

async fn load_products<C: ConnectionTrait>(
    conn: &C,
    request: &CreateOrderRequest,
) -> AppResult<HashMap<Uuid, products::Model>> {
    let ids: Vec<Uuid> = request.items.iter().map(|line| line.product_id).collect();
    let list = products::Entity::find()
        .filter(products::Column::Id.is_in(ids))
        .filter(products::Column::IsActive.eq(true))
        .all(conn)
        .await?;
    Ok(list.into_iter().map(|p| (p.id, p)).collect())
}
