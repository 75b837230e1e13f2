//! Cart view reconciliation.
//!
//! A stored cart only remembers what the shopper added and at which price. The
//! view handed back to clients compares every line against the live product
//! row and flags drift. Nothing here is persisted; the view is recomputed on
//! every read.

use common::{CartId, UserId};
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartLine};
use crate::value_objects::{AmountOverflow, Money};

/// A cart line with its drift flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub is_price_changed: bool,
    pub is_out_of_stock: bool,
}

impl CartLineView {
    /// Price times quantity at the current price.
    pub fn line_total(&self) -> Result<Money, AmountOverflow> {
        self.line.price.checked_multiply(self.line.quantity)
    }
}

/// The reconciled cart returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub cart_id: CartId,
    pub user_id: Option<UserId>,
    pub items: Vec<CartLineView>,
    /// Current price of every line that can still be fulfilled.
    pub total_price: Money,
    /// Quantity across all lines, including out-of-stock ones.
    pub total_items: u64,
    /// True if any line has drifted in price or stock.
    pub has_changed: bool,
}

/// Builds the view of `cart` from its joined lines.
///
/// Fails only if the total does not fit in `Money`.
pub fn reconcile(cart: &Cart, lines: Vec<CartLine>) -> Result<CartView, AmountOverflow> {
    let items: Vec<CartLineView> = lines
        .into_iter()
        .map(|line| CartLineView {
            is_price_changed: line.price_at_add != line.price,
            is_out_of_stock: line.quantity > line.stock,
            line,
        })
        .collect();

    let total_price = items
        .iter()
        .filter(|item| !item.is_out_of_stock)
        .try_fold(Money::zero(), |total, item| total.checked_add(item.line_total()?))?;
    let total_items = items.iter().map(|item| u64::from(item.line.quantity)).sum();
    let has_changed = items
        .iter()
        .any(|item| item.is_price_changed || item.is_out_of_stock);

    Ok(CartView {
        cart_id: cart.id,
        user_id: cart.owner.user_id(),
        items,
        total_price,
        total_items,
        has_changed,
    })
}
