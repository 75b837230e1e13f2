//! Checkout services for the shop.
//!
//! - [`OrderFulfillmentEngine`] turns carts into orders and drives order status
//! - [`CartService`] manages carts for guests and users
//! - [`ProductCatalog`] lists and edits products
//!
//! All services are generic over a [`store::Storage`] backend and take the
//! acting [`domain::Principal`] explicitly. Each operation runs as one
//! transaction bounded by [`EngineConfig::transaction_timeout`].

pub mod cart;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
mod transaction;

pub use cart::CartService;
pub use catalog::{ProductCatalog, ProductInput, ProductPatch};
pub use config::{DEFAULT_TRANSACTION_TIMEOUT, EngineConfig};
pub use engine::OrderFulfillmentEngine;
pub use error::{ErrorKind, Result, ShopError};
