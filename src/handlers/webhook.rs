use crate::error::AppError;
use crate::models::MobileMoneyWebhookRequest;
use crate::services::PaymentService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use log::{info, warn};

pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Mobile-money settlement callback.
///
/// Authenticated by a shared secret header instead of a bearer token. A
/// callback for a payment that already settled is acknowledged and ignored so
/// the provider stops retrying.
#[utoipa::path(
    post,
    path = "/webhook/momo",
    tag = "payment",
    request_body = MobileMoneyWebhookRequest,
    params(
        ("X-Webhook-Secret" = String, Header, description = "Shared webhook secret")
    ),
    responses(
        (status = 200, description = "Callback accepted"),
        (status = 401, description = "Bad or missing secret"),
        (status = 404, description = "Unknown transaction reference")
    )
)]
pub async fn momo_webhook(
    req: HttpRequest,
    payment_service: web::Data<PaymentService>,
    body: web::Json<MobileMoneyWebhookRequest>,
) -> Result<HttpResponse> {
    let provided = req
        .headers()
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !payment_service.verify_webhook_secret(provided) {
        warn!("Rejected mobile-money webhook with invalid secret");
        return Ok(AppError::AuthError("Invalid webhook secret".to_string()).error_response());
    }

    let callback = body.into_inner();
    match payment_service
        .settle_by_reference(&callback.transaction_ref, callback.status)
        .await
    {
        Ok(applied) => {
            info!(
                "Mobile-money webhook for {} ({:?}) applied: {applied}",
                callback.transaction_ref, callback.status
            );
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "received": true,
                "applied": applied
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/momo", web::post().to(momo_webhook)));
}
