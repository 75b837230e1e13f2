//! Orders and their immutable line items.

mod status;

pub use status::{OrderStatus, ParseOrderStatusError};

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::value_objects::{AmountOverflow, Money};

/// A placed order. The total is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price charged at checkout.
    pub price_at_purchase: Money,
}

/// An order line about to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Money,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Result<Money, AmountOverflow> {
        self.price_at_purchase.checked_multiply(self.quantity)
    }
}

/// An order about to be written, always in `pending`.
///
/// Built through [`NewOrder::new`] so the total is known to fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    items: Vec<NewOrderItem>,
    total: Money,
}

impl NewOrder {
    pub fn new(user_id: UserId, items: Vec<NewOrderItem>) -> Result<Self, AmountOverflow> {
        let total = items
            .iter()
            .try_fold(Money::zero(), |total, item| total.checked_add(item.line_total()?))?;
        Ok(Self {
            user_id,
            items,
            total,
        })
    }

    pub fn items(&self) -> &[NewOrderItem] {
        &self.items
    }

    /// Sum of the line totals.
    pub fn total(&self) -> Money {
        self.total
    }
}

/// An order line joined with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub price_at_purchase: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
}
