pub mod admin;
pub mod notification;
pub mod order;
pub mod payment;
pub mod pickup_location;
pub mod webhook;

pub use admin::admin_config;
pub use notification::notification_config;
pub use order::order_config;
pub use payment::payment_config;
pub use pickup_location::pickup_location_config;
pub use webhook::webhook_config;

use crate::error::{AppError, AppResult};
use crate::utils::AuthUser;
use actix_web::{HttpMessage, HttpRequest};

/// The user the auth middleware attached to this request.
pub(crate) fn current_user(req: &HttpRequest) -> AppResult<AuthUser> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))
}
