//! Shop error types.

use std::time::Duration;

use common::{CartItemId, OrderId, ProductId};
use domain::{AmountOverflow, Money, OrderStatus, ParseOrderStatusError};
use store::StoreError;
use thiserror::Error;

/// Broad class of a [`ShopError`], used to pick a response status and a
/// metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidState,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors returned by the shop services.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Cart is empty")]
    CartIsEmpty,

    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("Price must be between 0 and {}", Money::MAX_UNIT_PRICE)]
    InvalidPrice,

    #[error("Stock must not be negative")]
    InvalidStock,

    #[error("SKU already exists: {0}")]
    SkuExists(String),

    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// A cart or order total does not fit in the money range.
    #[error("Total amount is too large")]
    AmountTooLarge,

    /// Not enough stock to cover the requested quantity.
    #[error(
        "Not enough stock for product {product_id}: available {available}, requested {requested}"
    )]
    ProductNotEnough {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },

    /// The product is still referenced by carts or orders.
    #[error("Product {0} is still in use by carts or orders")]
    ProductInUse(ProductId),

    /// The caller is not authenticated.
    #[error("Authentication required")]
    Unauthorized,

    /// The caller is authenticated but may not perform the operation.
    #[error("No permissions for this operation")]
    NoPermissions,

    #[error("Item {0} is not in the cart")]
    ItemNotInCart(CartItemId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Only pending orders can be cancelled by their owner.
    #[error("Order cannot be cancelled in status {0}")]
    CannotCancelOrder(OrderStatus),

    #[error("Invalid status change from {from} to {to}")]
    InvalidStatusChange { from: OrderStatus, to: OrderStatus },

    /// The operation did not finish within the transaction deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl ShopError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShopError::InvalidQuantity
            | ShopError::CartIsEmpty
            | ShopError::NoFieldsToUpdate
            | ShopError::InvalidPrice
            | ShopError::InvalidStock
            | ShopError::SkuExists(_)
            | ShopError::InvalidStatus(_)
            | ShopError::AmountTooLarge => ErrorKind::Validation,
            ShopError::ProductNotEnough { .. } | ShopError::ProductInUse(_) => ErrorKind::Conflict,
            ShopError::Unauthorized => ErrorKind::Unauthorized,
            ShopError::NoPermissions => ErrorKind::Forbidden,
            ShopError::ItemNotInCart(_)
            | ShopError::OrderNotFound(_)
            | ShopError::ProductNotFound(_) => ErrorKind::NotFound,
            ShopError::CannotCancelOrder(_) | ShopError::InvalidStatusChange { .. } => {
                ErrorKind::InvalidState
            }
            ShopError::Timeout(_) => ErrorKind::Timeout,
            ShopError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for ShopError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => ShopError::ProductNotFound(id),
            StoreError::OrderNotFound(id) => ShopError::OrderNotFound(id),
            StoreError::ItemNotInCart(id) => ShopError::ItemNotInCart(id),
            StoreError::DuplicateSku(sku) => ShopError::SkuExists(sku),
            StoreError::QuantityOverflow { .. } => ShopError::InvalidQuantity,
            StoreError::ProductInUse(id) => ShopError::ProductInUse(id),
            other => ShopError::Store(other),
        }
    }
}

impl From<AmountOverflow> for ShopError {
    fn from(_: AmountOverflow) -> Self {
        ShopError::AmountTooLarge
    }
}

impl From<ParseOrderStatusError> for ShopError {
    fn from(err: ParseOrderStatusError) -> Self {
        ShopError::InvalidStatus(err.0)
    }
}

/// Convenience type alias for shop results.
pub type Result<T> = std::result::Result<T, ShopError>;
