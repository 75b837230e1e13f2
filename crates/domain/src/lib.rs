//! Domain layer for the shop checkout engine.
//!
//! This crate provides the plain data the engine moves around:
//! - Products, carts and orders with their id references
//! - The order status state machine
//! - The cart reconciler that flags price and stock drift
//! - The acting [`Principal`]

pub mod cart;
pub mod order;
pub mod principal;
pub mod product;
pub mod reconcile;
pub mod value_objects;

pub use cart::{Cart, CartItem, CartLine, CartOwner, CartStatus, ParseCartStatusError};
pub use order::{
    NewOrder, NewOrderItem, Order, OrderDetail, OrderItem, OrderLine, OrderStatus,
    ParseOrderStatusError,
};
pub use principal::{Identity, ParseRoleError, Principal, Role};
pub use product::{NewProduct, Product, ProductUpdate};
pub use reconcile::{CartLineView, CartView, reconcile};
pub use value_objects::{AmountOverflow, Money};
