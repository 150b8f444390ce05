use super::current_user;
use crate::models::*;
use crate::services::OrderService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/orders",
    tag = "order",
    request_body = CreateOrderRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 200, description = "Idempotent replay of an existing order", body = OrderResponse),
        (status = 400, description = "Invalid order"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service.create_order(user.id, body.into_inner()).await {
        Ok(order) if order.replayed => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Ok(order) => Ok(HttpResponse::Created().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders",
    tag = "order",
    params(
        ("page" = Option<u32>, Query, description = "Page number, starting at 1"),
        ("per_page" = Option<u32>, Query, description = "Page size"),
        ("status" = Option<String>, Query, description = "Filter by order status, e.g. confirmed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Orders placed by the caller"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service.list_orders(&user, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "order",
    params(
        ("id" = Uuid, Path, description = "Order id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Order with its items", body = OrderResponse),
        (status = 403, description = "Order belongs to another buyer"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn get_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service.get_order(&user, path.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_order))
            .route("", web::get().to(list_orders))
            .route("/{id}", web::get().to(get_order)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::database::test_support::{seed_product, setup_db};
    use crate::handlers::test_support::{bearer, jwt};
    use crate::middlewares::AuthMiddleware;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    fn order_body(product_id: Uuid, key: &str) -> Value {
        json!({
            "idempotencyKey": key,
            "shipping": {
                "deliveryMethod": "delivery",
                "fullName": "Nakato Sarah",
                "phone": "0772123456",
                "address": "Plot 4, Bombo Road",
                "city": "Kampala"
            },
            "paymentMethod": "mobile_money",
            "items": [
                { "lineId": Uuid::new_v4(), "productId": product_id, "quantity": 2 }
            ]
        })
    }

    #[actix_web::test]
    async fn test_create_then_replay_over_http() {
        let pool = setup_db().await;
        let product = seed_product(&pool, "Kitenge tote", 50_000, 10).await;
        let service = OrderService::new(pool.clone(), CheckoutConfig::default());
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt()))
                .app_data(web::Data::new(service))
                .service(web::scope("/api/v1").configure(order_config)),
        )
        .await;
        let buyer = Uuid::new_v4();

        let req = test::TestRequest::post()
            .uri("/api/v1/orders")
            .insert_header(bearer(buyer))
            .set_json(order_body(product.id, "http-key"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["data"]["totalAmount"], 115_000);
        assert_eq!(created["data"]["replayed"], false);

        let req = test::TestRequest::post()
            .uri("/api/v1/orders")
            .insert_header(bearer(buyer))
            .set_json(order_body(product.id, "http-key"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let replayed: Value = test::read_body_json(resp).await;
        assert_eq!(replayed["data"]["id"], created["data"]["id"]);
        assert_eq!(replayed["data"]["replayed"], true);
    }

    #[actix_web::test]
    async fn test_missing_token_is_rejected() {
        let pool = setup_db().await;
        let service = OrderService::new(pool, CheckoutConfig::default());
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt()))
                .app_data(web::Data::new(service))
                .service(web::scope("/api/v1").configure(order_config)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/orders").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
