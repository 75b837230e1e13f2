//! Identifier types shared by every crate in the workspace.

mod types;

pub use types::{CartId, CartItemId, OrderId, OrderItemId, ProductId, SessionId, UserId};
