//! Transactional storage for products, carts and orders.
//!
//! Every store call that participates in a unit of work takes the backend's
//! transaction handle (`&mut S::Tx`). Locking reads hold their row until the
//! transaction is committed, rolled back or dropped.

pub mod error;
mod locks;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, MemoryTx};
pub use postgres::PostgresStore;
pub use store::{CartStore, OrderLedger, ProductStock, Storage, Transactional};
