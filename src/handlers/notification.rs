use super::current_user;
use crate::models::*;
use crate::services::NotificationService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/notifications/email",
    tag = "notification",
    request_body = EmailNotificationRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Email accepted by the provider", body = EmailSendResponse),
        (status = 400, description = "Missing required field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is neither the buyer nor an admin"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Email provider rejected the message")
    )
)]
pub async fn send_email(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
    body: web::Json<EmailNotificationRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match notification_service
        .send_order_email(&user, body.into_inner())
        .await
    {
        Ok(sent) => Ok(HttpResponse::Ok().json(ApiResponse::success(sent))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn notification_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/notifications").route("/email", web::post().to(send_email)));
}
