//! Row locks for the in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;

use common::{CartId, OrderId, ProductId};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lockable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RowKey {
    Product(ProductId),
    Cart(CartId),
    Order(OrderId),
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowKey::Product(id) => write!(f, "products/{id}"),
            RowKey::Cart(id) => write!(f, "carts/{id}"),
            RowKey::Order(id) => write!(f, "orders/{id}"),
        }
    }
}

/// One mutex per row, created on first use.
#[derive(Clone, Default)]
pub(crate) struct RowLocks {
    rows: Arc<Mutex<HashMap<RowKey, Arc<Mutex<()>>>>>,
}

impl RowLocks {
    /// Waits for exclusive ownership of the row.
    pub(crate) async fn acquire(&self, key: RowKey) -> OwnedMutexGuard<()> {
        let row = {
            let mut rows = self.rows.lock().await;
            rows.entry(key).or_default().clone()
        };
        row.lock_owned().await
    }
}

/// Locks held by one transaction.
#[derive(Default)]
pub(crate) struct HeldLocks {
    guards: HashMap<RowKey, OwnedMutexGuard<()>>,
}

impl HeldLocks {
    pub(crate) fn holds(&self, key: RowKey) -> bool {
        self.guards.contains_key(&key)
    }

    /// Locks the row unless this transaction already holds it.
    pub(crate) async fn lock(&mut self, locks: &RowLocks, key: RowKey) {
        if self.holds(key) {
            return;
        }
        let guard = locks.acquire(key).await;
        tracing::trace!(row = %key, "row locked");
        self.guards.insert(key, guard);
    }
}
