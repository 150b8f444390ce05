use super::current_user;
use crate::models::*;
use crate::services::PaymentService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

/// Dispatchers answer with a flat body (`success`, `paymentId`, ...) rather
/// than the `data` envelope; the storefront reads them directly.
#[utoipa::path(
    post,
    path = "/payments/momo",
    tag = "payment",
    request_body = MobileMoneyPaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Collection request sent to the phone", body = MobileMoneyPaymentResponse),
        (status = 400, description = "Invalid phone number or amount"),
        (status = 403, description = "Order belongs to another buyer"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn mobile_money_payment(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    body: web::Json<MobileMoneyPaymentRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match payment_service
        .dispatch_mobile_money(&user, body.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/payments/cash",
    tag = "payment",
    request_body = CashPaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Cash payment recorded and order confirmed", body = CashPaymentResponse),
        (status = 400, description = "Amount does not match the order"),
        (status = 403, description = "Order belongs to another buyer"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn cash_payment(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    body: web::Json<CashPaymentRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match payment_service.dispatch_cash(&user, body.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "payment",
    params(
        ("id" = Uuid, Path, description = "Payment id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current payment status", body = PaymentStatusResponse),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment_status(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match payment_service
        .get_payment_status(&user, path.into_inner())
        .await
    {
        Ok(status) => Ok(HttpResponse::Ok().json(ApiResponse::success(status))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/momo", web::post().to(mobile_money_payment))
            .route("/cash", web::post().to(cash_payment))
            .route("/{id}", web::get().to(get_payment_status)),
    );
}
