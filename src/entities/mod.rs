pub mod order_items;
pub mod orders;
pub mod payments;
pub mod personalization_requests;
pub mod pickup_locations;
pub mod products;
pub mod user_roles;

pub use order_items as order_item_entity;
pub use orders as order_entity;
pub use payments as payment_entity;
pub use personalization_requests as personalization_request_entity;
pub use pickup_locations as pickup_location_entity;
pub use products as product_entity;
pub use user_roles as user_role_entity;

pub use orders::{DeliveryMethod, OrderStatus, PaymentMethod};
pub use payments::{PaymentProvider, PaymentStatus};
pub use personalization_requests::PersonalizationStatus;
pub use user_roles::AppRole;
