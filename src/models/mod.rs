pub mod checkout;
pub mod common;
pub mod notification;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod pickup_location;

pub use checkout::*;
pub use common::*;
pub use notification::*;
pub use order::*;
pub use pagination::*;
pub use payment::*;
pub use pickup_location::*;
