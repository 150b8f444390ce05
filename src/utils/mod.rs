pub mod jwt;
pub mod phone;
pub mod transaction_ref;

pub use jwt::*;
pub use phone::*;
pub use transaction_ref::{CASH_PREFIX, MOBILE_MONEY_PREFIX, generate_transaction_ref};
