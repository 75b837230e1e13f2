//! Cart use cases.

use common::{CartItemId, ProductId};
use domain::{Cart, CartLine, CartView, Money, Principal, reconcile};
use store::Storage;

use crate::config::EngineConfig;
use crate::error::{Result, ShopError};
use crate::transaction::{settle, with_deadline};

/// Validates a requested quantity.
fn checked_quantity(quantity: i64) -> Result<u32> {
    if quantity <= 0 {
        return Err(ShopError::InvalidQuantity);
    }
    u32::try_from(quantity).map_err(|_| ShopError::InvalidQuantity)
}

/// Cart total at current prices once the line for `product_id` holds
/// `quantity` units.
fn projected_total(
    lines: &[CartLine],
    product_id: ProductId,
    quantity: u32,
    price: Money,
) -> Result<Money> {
    let total = lines
        .iter()
        .filter(|line| line.product_id != product_id)
        .map(|line| (line.price, line.quantity))
        .chain(std::iter::once((price, quantity)))
        .try_fold(Money::zero(), |total, (price, quantity)| {
            total.checked_add(price.checked_multiply(quantity)?)
        })?;
    Ok(total)
}

/// Cart operations for guests and users.
///
/// Every call returns the reconciled view of the caller's cart.
#[derive(Clone)]
pub struct CartService<S: Storage> {
    store: S,
    config: EngineConfig,
}

impl<S: Storage> CartService<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Adds a product, merging with an existing line for it.
    ///
    /// The stock check here is advisory; checkout re-checks under lock.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn add_item(
        &self,
        principal: &Principal,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView> {
        let quantity = checked_quantity(quantity)?;

        let view = with_deadline(self.config.transaction_timeout, async {
            let product = self.store.get_product(product_id).await?;
            if !product.has_stock_for(quantity) {
                return Err(ShopError::ProductNotEnough {
                    product_id,
                    available: product.stock,
                    requested: quantity,
                });
            }

            let cart = self
                .store
                .get_or_create_active_cart(&principal.cart_owner())
                .await?;
            let mut tx = self.store.begin().await?;
            let outcome = self
                .merge_line(&mut tx, &cart, product_id, quantity, product.price)
                .await;
            settle(&self.store, tx, outcome).await?;

            self.view(&cart).await
        })
        .await?;

        metrics::counter!("cart_items_added_total").increment(u64::from(quantity));
        Ok(view)
    }

    /// Returns the caller's cart, creating it on first access.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn get_cart(&self, principal: &Principal) -> Result<CartView> {
        with_deadline(self.config.transaction_timeout, async {
            let cart = self
                .store
                .get_or_create_active_cart(&principal.cart_owner())
                .await?;
            self.view(&cart).await
        })
        .await
    }

    /// Sets the quantity of a line, refusing more than the product has in stock.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn update_item_quantity(
        &self,
        principal: &Principal,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartView> {
        let quantity = checked_quantity(quantity)?;

        with_deadline(self.config.transaction_timeout, async {
            let cart = self
                .store
                .get_or_create_active_cart(&principal.cart_owner())
                .await?;
            let mut tx = self.store.begin().await?;
            let outcome = self.set_quantity(&mut tx, &cart, item_id, quantity).await;
            settle(&self.store, tx, outcome).await?;

            self.view(&cart).await
        })
        .await
    }

    /// Stages the merge, then checks the cart total against committed lines
    /// while the cart row is held.
    async fn merge_line(
        &self,
        tx: &mut S::Tx,
        cart: &Cart,
        product_id: ProductId,
        quantity: u32,
        price: Money,
    ) -> Result<()> {
        let item = self
            .store
            .add_item(tx, cart.id, product_id, quantity, price)
            .await?;
        let lines = self.store.list_items(cart.id).await?;
        projected_total(&lines, product_id, item.quantity, price)?;
        Ok(())
    }

    async fn set_quantity(
        &self,
        tx: &mut S::Tx,
        cart: &Cart,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<()> {
        let item = self.store.get_item_for_update(tx, cart.id, item_id).await?;
        let product = self
            .store
            .get_product_for_update(tx, item.product_id)
            .await?;
        if !product.has_stock_for(quantity) {
            return Err(ShopError::ProductNotEnough {
                product_id: product.id,
                available: product.stock,
                requested: quantity,
            });
        }
        let lines = self.store.list_items(cart.id).await?;
        projected_total(&lines, product.id, quantity, product.price)?;

        self.store
            .update_item_quantity(tx, cart.id, item_id, quantity)
            .await?;
        Ok(())
    }

    /// Removes a line from the caller's cart.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn remove_item(&self, principal: &Principal, item_id: CartItemId) -> Result<CartView> {
        with_deadline(self.config.transaction_timeout, async {
            let cart = self
                .store
                .get_or_create_active_cart(&principal.cart_owner())
                .await?;
            let mut tx = self.store.begin().await?;
            let outcome = self
                .store
                .remove_item(&mut tx, cart.id, item_id)
                .await
                .map_err(ShopError::from);
            settle(&self.store, tx, outcome).await?;

            self.view(&cart).await
        })
        .await
    }

    /// Empties the caller's cart.
    #[tracing::instrument(skip(self, principal), fields(user_id = ?principal.user_id()))]
    pub async fn clear_cart(&self, principal: &Principal) -> Result<CartView> {
        with_deadline(self.config.transaction_timeout, async {
            let cart = self
                .store
                .get_or_create_active_cart(&principal.cart_owner())
                .await?;
            let mut tx = self.store.begin().await?;
            let outcome = self
                .store
                .clear_cart(&mut tx, cart.id)
                .await
                .map_err(ShopError::from);
            settle(&self.store, tx, outcome).await?;

            self.view(&cart).await
        })
        .await
    }

    async fn view(&self, cart: &Cart) -> Result<CartView> {
        let lines = self.store.list_items(cart.id).await?;
        Ok(reconcile(cart, lines)?)
    }
}

#[cfg(test)]
mod tests {
    use common::UserId;
    use domain::{Money, NewProduct, Role};
    use store::{InMemoryStore, ProductStock, Transactional};

    use super::*;

    async fn setup(stock: u32) -> (CartService<InMemoryStore>, InMemoryStore, ProductId) {
        let store = InMemoryStore::new();
        let product = store
            .insert_product(NewProduct {
                name: "Widget".to_string(),
                price: Money::from_cents(1500),
                stock,
                sku: "W-1".to_string(),
                owner_id: UserId::new(1),
            })
            .await
            .unwrap();
        let service = CartService::new(store.clone(), EngineConfig::default());
        (service, store, product.id)
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(matches!(checked_quantity(0), Err(ShopError::InvalidQuantity)));
        assert!(matches!(checked_quantity(-3), Err(ShopError::InvalidQuantity)));
        assert_eq!(checked_quantity(4).unwrap(), 4);
    }

    #[tokio::test]
    async fn guest_can_add_items() {
        let (service, _, product_id) = setup(10).await;
        let guest = Principal::guest("sess-1");

        let view = service.add_item(&guest, product_id, 2).await.unwrap();
        assert_eq!(view.total_items, 2);
        assert_eq!(view.total_price, Money::from_cents(3000));
        assert_eq!(view.user_id, None);
    }

    #[tokio::test]
    async fn add_more_than_stock_is_rejected() {
        let (service, _, product_id) = setup(3).await;
        let user = Principal::user(UserId::new(2), Role::Customer);

        let err = service.add_item(&user, product_id, 4).await.unwrap_err();
        assert!(matches!(err, ShopError::ProductNotEnough { available: 3, .. }));
        assert!(service.get_cart(&user).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn add_unknown_product_is_not_found() {
        let (service, _, _) = setup(3).await;
        let user = Principal::user(UserId::new(2), Role::Customer);

        let err = service
            .add_item(&user, ProductId::new(999), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn zero_quantity_update_is_rejected() {
        let (service, _, product_id) = setup(10).await;
        let user = Principal::user(UserId::new(2), Role::Customer);
        let view = service.add_item(&user, product_id, 1).await.unwrap();

        let err = service
            .update_item_quantity(&user, view.items[0].line.item_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidQuantity));
    }

    #[tokio::test]
    async fn price_change_is_flagged_in_view() {
        let (service, store, product_id) = setup(10).await;
        let user = Principal::user(UserId::new(2), Role::Customer);
        service.add_item(&user, product_id, 1).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        store.get_product_for_update(&mut tx, product_id).await.unwrap();
        store
            .update_product(
                &mut tx,
                product_id,
                &domain::ProductUpdate {
                    price: Some(Money::from_cents(1800)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store.commit(tx).await.unwrap();

        let view = service.get_cart(&user).await.unwrap();
        assert!(view.has_changed);
        assert!(view.items[0].is_price_changed);
        assert_eq!(view.total_price, Money::from_cents(1800));
    }

    #[tokio::test]
    async fn removing_foreign_item_is_not_in_cart() {
        let (service, _, product_id) = setup(10).await;
        let owner = Principal::user(UserId::new(2), Role::Customer);
        let other = Principal::user(UserId::new(3), Role::Customer);
        let view = service.add_item(&owner, product_id, 1).await.unwrap();

        let err = service
            .remove_item(&other, view.items[0].line.item_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ItemNotInCart(_)));
        assert_eq!(service.get_cart(&owner).await.unwrap().items.len(), 1);
    }

    async fn priced(store: &InMemoryStore, sku: &str, price: Money, stock: u32) -> ProductId {
        store
            .insert_product(NewProduct {
                name: sku.to_string(),
                price,
                stock,
                sku: sku.to_string(),
                owner_id: UserId::new(1),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn total_out_of_range_leaves_cart_untouched() {
        let (service, store, widget) = setup(10).await;
        let huge = priced(&store, "H-1", Money::from_cents(i64::MAX / 2), 10).await;
        let user = Principal::user(UserId::new(2), Role::Customer);
        service.add_item(&user, widget, 1).await.unwrap();

        let err = service.add_item(&user, huge, 3).await.unwrap_err();
        assert!(matches!(err, ShopError::AmountTooLarge));

        let view = service.get_cart(&user).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total_price, Money::from_cents(1500));
    }

    #[tokio::test]
    async fn largest_unit_price_fits_only_one_full_line() {
        let store = InMemoryStore::new();
        let a = priced(&store, "A", Money::MAX_UNIT_PRICE, u32::MAX).await;
        let b = priced(&store, "B", Money::MAX_UNIT_PRICE, u32::MAX).await;
        let service = CartService::new(store, EngineConfig::default());
        let user = Principal::user(UserId::new(2), Role::Customer);

        let view = service.add_item(&user, a, i64::from(u32::MAX)).await.unwrap();
        assert_eq!(view.total_items, u64::from(u32::MAX));

        let err = service.add_item(&user, b, 1).await.unwrap_err();
        assert!(matches!(err, ShopError::AmountTooLarge));

        let err = service.add_item(&user, a, 1).await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidQuantity));

        let item_id = view.items[0].line.item_id;
        service.update_item_quantity(&user, item_id, 1).await.unwrap();
        let view = service.add_item(&user, b, 1).await.unwrap();
        assert_eq!(view.items.len(), 2);

        let err = service
            .update_item_quantity(&user, item_id, i64::from(u32::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::AmountTooLarge));
    }

    #[tokio::test]
    async fn clear_cart_empties_view() {
        let (service, _, product_id) = setup(10).await;
        let user = Principal::user(UserId::new(2), Role::Customer);
        service.add_item(&user, product_id, 2).await.unwrap();

        let view = service.clear_cart(&user).await.unwrap();
        assert!(view.items.is_empty());
        assert!(view.total_price.is_zero());
    }
}
