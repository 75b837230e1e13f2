//! Products as seen by the checkout engine.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::value_objects::Money;

/// A sellable product with its live price and available stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    /// Units available for sale; never negative.
    pub stock: u32,
    pub sku: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true if `quantity` units can be taken from stock.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}

/// Fields needed to list a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub sku: String,
    pub owner_id: UserId,
}

/// A partial update of a product. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub sku: Option<String>,
}

impl ProductUpdate {
    /// Returns true when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.stock.is_none() && self.sku.is_none()
    }

    /// Applies the changes to a product row.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(sku) = &self.sku {
            product.sku = sku.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            stock: 5,
            sku: "SKU-001".to_string(),
            owner_id: UserId::new(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn has_stock_for_is_inclusive() {
        let product = widget();
        assert!(product.has_stock_for(5));
        assert!(!product.has_stock_for(6));
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(ProductUpdate::default().is_empty());
        let update = ProductUpdate {
            stock: Some(0),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn update_applies_only_present_fields() {
        let mut product = widget();
        ProductUpdate {
            price: Some(Money::from_cents(1500)),
            ..Default::default()
        }
        .apply_to(&mut product);

        assert_eq!(product.price, Money::from_cents(1500));
        assert_eq!(product.name, "Widget");
        assert_eq!(product.stock, 5);
    }
}
