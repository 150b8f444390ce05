use super::current_user;
use crate::entities::OrderStatus;
use crate::error::AppError;
use crate::models::*;
use crate::services::{NotificationService, OrderService, RoleService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    put,
    path = "/admin/orders/{id}/status",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Order id")
    ),
    request_body = UpdateOrderStatusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Status changed"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is already delivered or cancelled"),
        (status = 500, description = "Status changed but the email could not be sent")
    )
)]
pub async fn update_order_status(
    order_service: web::Data<OrderService>,
    role_service: web::Data<RoleService>,
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse> {
    let admin = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    if let Err(e) = role_service.require_admin(&admin).await {
        return Ok(e.error_response());
    }

    let order_id = path.into_inner();
    let body = body.into_inner();

    // Check before touching the order so a bad request changes nothing
    if body.notify && body.email.as_deref().is_none_or(|e| e.trim().is_empty()) {
        return Ok(
            AppError::ValidationError("email is required when notify is set".to_string())
                .error_response(),
        );
    }

    let order = match order_service.update_status(order_id, body.status).await {
        Ok(order) => order,
        Err(e) => return Ok(e.error_response()),
    };

    let mut notification_id = None;
    if body.notify {
        let kind = if body.status == OrderStatus::Shipped {
            NotificationType::Shipped
        } else {
            NotificationType::StatusUpdate
        };
        let request = EmailNotificationRequest {
            notification_type: Some(kind),
            email: body.email,
            customer_name: body.customer_name.or(Some(order.shipping_name.clone())),
            order_id: Some(order.id),
            new_status: Some(order.status),
            tracking_number: body.tracking_number,
            ..Default::default()
        };
        match notification_service.send_order_email(&admin, request).await {
            Ok(sent) => notification_id = Some(sent.id),
            Err(e) => return Ok(e.error_response()),
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "orderId": order.id,
            "status": order.status,
            "notificationId": notification_id
        }
    })))
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin").route("/orders/{id}/status", web::put().to(update_order_status)),
    );
}
