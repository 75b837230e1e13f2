//! In-memory backend.
//!
//! Committed rows live in [`Tables`] behind one `RwLock`. A transaction locks
//! rows through per-row mutexes, stages its writes privately and applies them
//! to the tables at commit. Dropping a [`MemoryTx`] discards the staged writes
//! and releases its row locks, which is a rollback.
//!
//! A row lock is always acquired before the tables are read, and the tables
//! guard is never held across a lock wait.

mod carts;
mod orders;
mod products;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, OrderId, ProductId};
use domain::{Cart, CartItem, Order, OrderItem, Product};
use tokio::sync::RwLock;

use crate::locks::{HeldLocks, RowKey, RowLocks};
use crate::{Result, StoreError, Transactional};

/// Committed state.
#[derive(Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    cart_items: HashMap<CartId, Vec<CartItem>>,
    orders: BTreeMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<OrderItem>>,
}

/// Row id sequences, starting at 1.
#[derive(Default)]
struct Sequences {
    product: AtomicI64,
    cart_item: AtomicI64,
    order: AtomicI64,
    order_item: AtomicI64,
}

impl Sequences {
    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// In-memory store implementation.
///
/// Provides the same locking semantics as the PostgreSQL implementation, so
/// it can back the engine in tests and single-process deployments.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    locks: RowLocks,
    ids: Arc<Sequences>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

/// Transaction handle of the in-memory backend.
#[derive(Default)]
pub struct MemoryTx {
    locks: HeldLocks,
    products: HashMap<ProductId, Product>,
    deleted_products: BTreeSet<ProductId>,
    cart_items: HashMap<CartId, Vec<CartItem>>,
    orders: HashMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<OrderItem>>,
}

impl MemoryTx {
    fn require(&self, key: RowKey) -> Result<()> {
        if self.locks.holds(key) {
            Ok(())
        } else {
            Err(StoreError::LockNotHeld(key.to_string()))
        }
    }
}

#[async_trait]
impl Transactional for InMemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        Ok(MemoryTx::default())
    }

    async fn commit(&self, tx: MemoryTx) -> Result<()> {
        let MemoryTx {
            locks,
            products,
            deleted_products,
            cart_items,
            orders,
            order_items,
        } = tx;

        {
            let mut tables = self.tables.write().await;
            let now = Utc::now();

            tables.products.extend(products);
            for id in deleted_products {
                tables.products.remove(&id);
            }
            for (cart_id, items) in cart_items {
                if let Some(cart) = tables.carts.get_mut(&cart_id) {
                    cart.updated_at = now;
                }
                tables.cart_items.insert(cart_id, items);
            }
            tables.orders.extend(orders);
            tables.order_items.extend(order_items);
        }

        // Rows are released only once their new values are visible.
        drop(locks);
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<()> {
        drop(tx);
        Ok(())
    }
}
