use crate::entities::order_entity as orders;
use crate::error::{AppError, AppResult};
use crate::external::{EmailMessage, EmailSender};
use crate::models::{EmailNotificationRequest, EmailSendResponse};
use crate::services::RoleService;
use crate::services::email_templates;
use crate::utils::AuthUser;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;

#[derive(Clone)]
pub struct NotificationService {
    pool: DatabaseConnection,
    roles: RoleService,
    sender: Arc<dyn EmailSender>,
    from_address: String,
    currency: String,
}

impl NotificationService {
    pub fn new(
        pool: DatabaseConnection,
        roles: RoleService,
        sender: Arc<dyn EmailSender>,
        from_address: String,
        currency: String,
    ) -> Self {
        Self {
            pool,
            roles,
            sender,
            from_address,
            currency,
        }
    }

    /// Send an order email on behalf of `caller`.
    ///
    /// Only the order's buyer or an admin may trigger it; anyone else gets
    /// `Forbidden` and the provider is never contacted.
    pub async fn send_order_email(
        &self,
        caller: &AuthUser,
        request: EmailNotificationRequest,
    ) -> AppResult<EmailSendResponse> {
        let kind = request.notification_type.ok_or_else(|| {
            AppError::ValidationError("Missing required field: type".to_string())
        })?;
        let recipient = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::ValidationError("Missing required field: email".to_string()))?;
        let order_id = request.order_id.ok_or_else(|| {
            AppError::ValidationError("Missing required field: orderId".to_string())
        })?;

        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.buyer_id != caller.id && !self.roles.is_admin(caller.id).await? {
            log::warn!(
                "User {} tried to send {:?} email for order {} they do not own",
                caller.id,
                kind,
                order_id
            );
            return Err(AppError::Forbidden);
        }

        let rendered = email_templates::render(kind, &request, &order, &self.currency)?;

        let sent = self
            .sender
            .send(EmailMessage {
                from: self.from_address.clone(),
                to: vec![recipient],
                subject: rendered.subject,
                html: rendered.html,
            })
            .await?;

        log::info!("{kind:?} email {} sent for order {order_id}", sent.id);
        Ok(sent)
    }
}
