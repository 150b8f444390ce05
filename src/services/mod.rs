pub mod email_templates;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod pickup_location_service;
pub mod role_service;

pub use notification_service::*;
pub use order_service::*;
pub use payment_service::*;
pub use pickup_location_service::*;
pub use role_service::*;
