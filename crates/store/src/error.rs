use common::{CartId, CartItemId, OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The product row does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The cart row does not exist.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The item does not exist in the given cart.
    #[error("Item {0} is not in the cart")]
    ItemNotInCart(CartItemId),

    /// The order row does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stock decrease would drive the stock below zero.
    #[error("Stock underflow for product {product_id}: available {available}, requested {requested}")]
    StockUnderflow {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },

    /// Returning stock would exceed the largest stock level.
    #[error("Stock of product {0} would overflow")]
    StockOverflow(ProductId),

    /// Merging into an existing cart line would exceed the largest quantity.
    #[error("Quantity of product {product_id} in cart {cart_id} would overflow")]
    QuantityOverflow {
        cart_id: CartId,
        product_id: ProductId,
    },

    /// The product is still referenced by cart or order lines.
    #[error("Product {0} is still referenced by carts or orders")]
    ProductInUse(ProductId),

    /// A write was attempted on a row the transaction has not locked.
    #[error("Row lock not held: {0}")]
    LockNotHeld(String),

    /// Another product already uses the SKU.
    #[error("SKU already exists: {0}")]
    DuplicateSku(String),

    /// A stored value could not be mapped back into the domain.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
