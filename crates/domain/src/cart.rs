//! Carts and cart lines.

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, ProductId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_objects::Money;

/// Lifecycle status of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    /// Open cart of an authenticated user.
    Active,
    /// Open cart of an anonymous session.
    Guest,
    Saved,
    Ordered,
}

impl CartStatus {
    /// Returns true for the statuses a principal shops in.
    pub fn is_open(&self) -> bool {
        matches!(self, CartStatus::Active | CartStatus::Guest)
    }

    /// Returns the status name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Guest => "guest",
            CartStatus::Saved => "saved",
            CartStatus::Ordered => "ordered",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a stored cart status is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown cart status: {0}")]
pub struct ParseCartStatusError(pub String);

impl std::str::FromStr for CartStatus {
    type Err = ParseCartStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CartStatus::Active),
            "guest" => Ok(CartStatus::Guest),
            "saved" => Ok(CartStatus::Saved),
            "ordered" => Ok(CartStatus::Ordered),
            other => Err(ParseCartStatusError(other.to_string())),
        }
    }
}

/// Owner of a cart. Exactly one of user or session, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartOwner {
    User(UserId),
    Session(SessionId),
}

impl CartOwner {
    /// Status an open cart of this owner carries.
    pub fn open_status(&self) -> CartStatus {
        match self {
            CartOwner::User(_) => CartStatus::Active,
            CartOwner::Session(_) => CartStatus::Guest,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            CartOwner::User(id) => Some(*id),
            CartOwner::Session(_) => None,
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            CartOwner::User(_) => None,
            CartOwner::Session(session) => Some(session),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub owner: CartOwner,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an open cart for the owner.
    pub fn open(owner: CartOwner) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::new(),
            status: owner.open_status(),
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// Always greater than zero.
    pub quantity: u32,
    /// Price snapshot taken when the product was first added.
    pub price_at_add: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the live product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_add: Money,
    pub name: String,
    /// Current product price.
    pub price: Money,
    /// Current product stock.
    pub stock: u32,
    pub sku: Option<String>,
}
