use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, ProductId, UserId};
use domain::{
    Cart, CartItem, CartLine, CartOwner, Money, NewOrder, NewProduct, Order, OrderItem, OrderLine,
    OrderStatus, Product, ProductUpdate,
};

use crate::Result;

/// A backend that can open units of work.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// The transaction handle threaded through every transactional call.
    type Tx: Send;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Makes every write of the transaction visible and releases its locks.
    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    /// Discards every write of the transaction and releases its locks.
    async fn rollback(&self, tx: Self::Tx) -> Result<()>;
}

/// Product rows and their stock.
#[async_trait]
pub trait ProductStock: Transactional {
    /// Reads a product without locking it.
    async fn get_product(&self, id: ProductId) -> Result<Product>;

    /// Reads a product and locks its row until the transaction ends.
    async fn get_product_for_update(&self, tx: &mut Self::Tx, id: ProductId) -> Result<Product>;

    /// Takes `quantity` units from stock.
    ///
    /// Fails with `StockUnderflow` rather than going below zero.
    async fn decrease_stock(&self, tx: &mut Self::Tx, id: ProductId, quantity: u32) -> Result<()>;

    /// Gives `quantity` units back to stock.
    async fn increase_stock(&self, tx: &mut Self::Tx, id: ProductId, quantity: u32) -> Result<()>;

    /// Returns true if any product uses the SKU.
    async fn sku_exists(&self, sku: &str) -> Result<bool>;

    /// Inserts a product. Fails with `DuplicateSku` if the SKU is taken.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Applies a partial update to a locked product.
    async fn update_product(
        &self,
        tx: &mut Self::Tx,
        id: ProductId,
        changes: &ProductUpdate,
    ) -> Result<Product>;

    /// Deletes a locked product.
    ///
    /// Fails with `ProductInUse` while any cart or order line refers to it.
    async fn delete_product(&self, tx: &mut Self::Tx, id: ProductId) -> Result<()>;
}

/// Carts and their lines.
///
/// Every mutation locks the cart row before touching its items.
#[async_trait]
pub trait CartStore: Transactional {
    /// Returns the owner's open cart, creating it if none exists.
    ///
    /// At most one open cart exists per owner, even under concurrent calls.
    async fn get_or_create_active_cart(&self, owner: &CartOwner) -> Result<Cart>;

    /// Locks the user's active cart, if there is one.
    async fn lock_active_cart(&self, tx: &mut Self::Tx, user_id: UserId) -> Result<Option<Cart>>;

    /// Adds a product to the cart, merging with an existing line for it.
    async fn add_item(
        &self,
        tx: &mut Self::Tx,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
        price_at_add: Money,
    ) -> Result<CartItem>;

    /// Lists the cart's lines joined with their live product rows, newest first.
    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartLine>>;

    /// Lists the cart's items as seen by the transaction.
    async fn cart_items(&self, tx: &mut Self::Tx, cart_id: CartId) -> Result<Vec<CartItem>>;

    /// Locks the cart and reads one of its items.
    async fn get_item_for_update(
        &self,
        tx: &mut Self::Tx,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<CartItem>;

    async fn update_item_quantity(
        &self,
        tx: &mut Self::Tx,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<()>;

    /// Removes an item. Fails with `ItemNotInCart` if the cart has no such item.
    async fn remove_item(&self, tx: &mut Self::Tx, cart_id: CartId, item_id: CartItemId)
    -> Result<()>;

    /// Removes every item of the cart. The cart itself stays.
    async fn clear_cart(&self, tx: &mut Self::Tx, cart_id: CartId) -> Result<()>;
}

/// Orders and their immutable lines.
#[async_trait]
pub trait OrderLedger: Transactional {
    /// Writes a `pending` order with its lines.
    async fn insert_order(&self, tx: &mut Self::Tx, order: &NewOrder) -> Result<Order>;

    /// Reads an order without locking it.
    async fn get_order(&self, id: OrderId) -> Result<Order>;

    /// Reads an order and locks its row until the transaction ends.
    async fn get_order_for_update(&self, tx: &mut Self::Tx, id: OrderId) -> Result<Order>;

    /// Lists the lines of an order as seen by the transaction.
    async fn order_items(&self, tx: &mut Self::Tx, id: OrderId) -> Result<Vec<OrderItem>>;

    /// Lists the lines of an order joined with their products.
    async fn order_lines(&self, id: OrderId) -> Result<Vec<OrderLine>>;

    /// Sets the status of a locked order.
    async fn set_order_status(
        &self,
        tx: &mut Self::Tx,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order>;

    /// Lists a user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}

/// Everything the checkout engine needs from a backend.
pub trait Storage: ProductStock + CartStore + OrderLedger + Clone + 'static {}

impl<T> Storage for T where T: ProductStock + CartStore + OrderLedger + Clone + 'static {}
