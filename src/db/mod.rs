//! Database access layer

pub mod cart;
pub mod discounts;
pub mod orders;
pub mod payment_accounts;
pub mod payouts;
pub mod points;
pub mod products;
pub mod settings;
pub mod webhook_events;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
