use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    DeliveryMethod, OrderStatus, PaymentMethod, PaymentProvider, PaymentStatus,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::order::create_order,
        handlers::order::list_orders,
        handlers::order::get_order,
        handlers::pickup_location::list_pickup_locations,
        handlers::payment::mobile_money_payment,
        handlers::payment::cash_payment,
        handlers::payment::get_payment_status,
        handlers::notification::send_email,
        handlers::admin::update_order_status,
        handlers::webhook::momo_webhook,
    ),
    components(
        schemas(
            OrderStatus,
            DeliveryMethod,
            PaymentMethod,
            PaymentProvider,
            PaymentStatus,
            ShippingDetails,
            OrderLineRequest,
            CreateOrderRequest,
            OrderItemResponse,
            OrderResponse,
            OrderQuery,
            UpdateOrderStatusRequest,
            PickupLocationResponse,
            PickupDetails,
            MobileMoneyProvider,
            MobileMoneyPaymentRequest,
            MobileMoneyPaymentResponse,
            CashPaymentRequest,
            CashPaymentResponse,
            PaymentStatusResponse,
            SettlementOutcome,
            MobileMoneyWebhookRequest,
            NotificationType,
            EmailLineItem,
            EmailNotificationRequest,
            EmailSendResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "order", description = "Order placement and history"),
        (name = "pickup", description = "Pickup points"),
        (name = "payment", description = "Mobile money and cash payments"),
        (name = "notification", description = "Transactional email"),
        (name = "admin", description = "Order administration"),
    ),
    info(
        title = "Artisan Market API",
        version = "1.0.0",
        description = "Checkout, payment and notification API for Artisan Market"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
