//! End-to-end checkout tests against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use common::{ProductId, UserId};
use domain::{Money, OrderStatus, Principal, ProductUpdate, Role};
use fulfillment::{
    CartService, EngineConfig, OrderFulfillmentEngine, ProductCatalog, ProductInput, ShopError,
};
use store::{InMemoryStore, OrderLedger, ProductStock, Transactional};

struct Shop {
    store: InMemoryStore,
    catalog: ProductCatalog<InMemoryStore>,
    carts: CartService<InMemoryStore>,
    engine: OrderFulfillmentEngine<InMemoryStore>,
}

fn shop_with(config: EngineConfig) -> Shop {
    let store = InMemoryStore::new();
    Shop {
        catalog: ProductCatalog::new(store.clone(), config),
        carts: CartService::new(store.clone(), config),
        engine: OrderFulfillmentEngine::new(store.clone(), config),
        store,
    }
}

fn shop() -> Shop {
    shop_with(EngineConfig::default())
}

fn seller() -> Principal {
    Principal::user(UserId::new(1000), Role::Seller)
}

fn customer(id: i64) -> Principal {
    Principal::user(UserId::new(id), Role::Customer)
}

fn admin() -> Principal {
    Principal::admin(UserId::new(1))
}

impl Shop {
    async fn product(&self, sku: &str, dollars: i64, stock: i64) -> ProductId {
        self.catalog
            .create_product(
                &seller(),
                ProductInput {
                    name: format!("Product {sku}"),
                    price: Money::from_dollars(dollars),
                    stock,
                    sku: sku.to_string(),
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn stock(&self, id: ProductId) -> u32 {
        self.store.get_product(id).await.unwrap().stock
    }

    async fn set_price(&self, id: ProductId, price: Money) {
        let mut tx = self.store.begin().await.unwrap();
        self.store.get_product_for_update(&mut tx, id).await.unwrap();
        self.store
            .update_product(
                &mut tx,
                id,
                &ProductUpdate {
                    price: Some(price),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        self.store.commit(tx).await.unwrap();
    }
}

#[tokio::test]
async fn checkout_scenario_totals_and_empties_cart() {
    let shop = shop();
    let a = shop.product("A", 100, 10).await;
    let b = shop.product("B", 80, 5).await;
    let buyer = customer(1);

    shop.carts.add_item(&buyer, a, 2).await.unwrap();
    shop.carts.add_item(&buyer, b, 1).await.unwrap();

    let order = shop.engine.create_order(&buyer).await.unwrap();
    assert_eq!(order.total, Money::from_dollars(280));
    assert_eq!(order.status, OrderStatus::Pending);

    assert_eq!(shop.stock(a).await, 8);
    assert_eq!(shop.stock(b).await, 4);
    assert!(shop.carts.get_cart(&buyer).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn second_checkout_of_same_cart_is_empty() {
    let shop = shop();
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 3).await.unwrap();

    shop.engine.create_order(&buyer).await.unwrap();
    let err = shop.engine.create_order(&buyer).await.unwrap_err();

    assert!(matches!(err, ShopError::CartIsEmpty));
    assert_eq!(shop.stock(a).await, 7);
}

#[tokio::test]
async fn concurrent_checkouts_of_one_cart_place_one_order() {
    let shop = Arc::new(shop());
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 4).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shop = Arc::clone(&shop);
            let buyer = buyer.clone();
            tokio::spawn(async move { shop.engine.create_order(&buyer).await })
        })
        .collect();

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(err) => assert!(matches!(err, ShopError::CartIsEmpty)),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(shop.stock(a).await, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
    let shop = Arc::new(shop());
    let a = shop.product("A", 10, 10).await;
    let b = shop.product("B", 20, 6).await;

    // Twenty buyers want 1 of A and 1 of B each, in opposite add orders.
    for id in 1..=20 {
        let buyer = customer(id);
        if id % 2 == 0 {
            shop.carts.add_item(&buyer, a, 1).await.unwrap();
            shop.carts.add_item(&buyer, b, 1).await.unwrap();
        } else {
            shop.carts.add_item(&buyer, b, 1).await.unwrap();
            shop.carts.add_item(&buyer, a, 1).await.unwrap();
        }
    }

    let handles: Vec<_> = (1..=20)
        .map(|id| {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.engine.create_order(&customer(id)).await })
        })
        .collect();

    let mut placed = 0u32;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(err) => assert!(matches!(err, ShopError::ProductNotEnough { .. })),
        }
    }

    assert_eq!(placed, 6);
    assert_eq!(shop.stock(b).await, 0);
    assert_eq!(shop.stock(a).await, 10 - placed);
    assert_eq!(shop.store.order_count().await, 6);
}

#[tokio::test]
async fn checkout_charges_locked_price_and_freezes_it() {
    let shop = shop();
    let a = shop.product("A", 50, 10).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 2).await.unwrap();

    // Price moved after the item was added; checkout charges the current one.
    shop.set_price(a, Money::from_dollars(60)).await;
    let order = shop.engine.create_order(&buyer).await.unwrap();
    assert_eq!(order.total, Money::from_dollars(120));

    // Later changes never touch the order.
    shop.set_price(a, Money::from_dollars(5)).await;
    let detail = shop.engine.get_order_detail(&buyer, order.id).await.unwrap();
    assert_eq!(detail.order.total, Money::from_dollars(120));
    assert_eq!(detail.items[0].price_at_purchase, Money::from_dollars(60));
    assert_eq!(detail.items[0].line_total, Money::from_dollars(120));
}

#[tokio::test]
async fn cancelling_returns_stock() {
    let shop = shop();
    let a = shop.product("A", 10, 10).await;
    let b = shop.product("B", 10, 7).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 3).await.unwrap();
    shop.carts.add_item(&buyer, b, 2).await.unwrap();

    let order = shop.engine.create_order(&buyer).await.unwrap();
    assert_eq!(shop.stock(a).await, 7);
    assert_eq!(shop.stock(b).await, 5);

    let cancelled = shop.engine.cancel_order(&buyer, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(shop.stock(a).await, 10);
    assert_eq!(shop.stock(b).await, 7);

    // A second cancel must not return the stock twice.
    let err = shop.engine.cancel_order(&buyer, order.id).await.unwrap_err();
    assert!(matches!(
        err,
        ShopError::CannotCancelOrder(OrderStatus::Cancelled)
    ));
    assert_eq!(shop.stock(a).await, 10);
}

#[tokio::test]
async fn concurrent_cancels_return_stock_once() {
    let shop = Arc::new(shop());
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 4).await.unwrap();
    let order = shop.engine.create_order(&buyer).await.unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let shop = Arc::clone(&shop);
            let buyer = buyer.clone();
            tokio::spawn(async move { shop.engine.cancel_order(&buyer, order.id).await })
        })
        .collect();

    let mut cancelled = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            cancelled += 1;
        }
    }

    assert_eq!(cancelled, 1);
    assert_eq!(shop.stock(a).await, 10);
}

#[tokio::test]
async fn only_owner_can_cancel_and_only_while_pending() {
    let shop = shop();
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 1).await.unwrap();
    let order = shop.engine.create_order(&buyer).await.unwrap();

    let err = shop
        .engine
        .cancel_order(&customer(2), order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NoPermissions));

    shop.engine
        .update_order_status(&admin(), order.id, OrderStatus::Paid)
        .await
        .unwrap();
    let err = shop.engine.cancel_order(&buyer, order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::CannotCancelOrder(OrderStatus::Paid)));
}

#[tokio::test]
async fn admin_walks_order_to_completion_without_touching_stock() {
    let shop = shop();
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 2).await.unwrap();
    let order = shop.engine.create_order(&buyer).await.unwrap();

    for next in [OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Completed] {
        let updated = shop
            .engine
            .update_order_status(&admin(), order.id, next)
            .await
            .unwrap();
        assert_eq!(updated.status, next);
    }
    assert_eq!(shop.stock(a).await, 8);

    let err = shop
        .engine
        .update_order_status(&admin(), order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::InvalidStatusChange {
            from: OrderStatus::Completed,
            to: OrderStatus::Cancelled
        }
    ));
}

#[tokio::test]
async fn admin_cancel_of_paid_order_returns_stock() {
    let shop = shop();
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 3).await.unwrap();
    let order = shop.engine.create_order(&buyer).await.unwrap();

    shop.engine
        .update_order_status(&admin(), order.id, OrderStatus::Paid)
        .await
        .unwrap();
    assert_eq!(shop.stock(a).await, 7);

    shop.engine
        .update_order_status(&admin(), order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(shop.stock(a).await, 10);
}

#[tokio::test]
async fn status_machine_rejects_every_unlisted_pair() {
    let shop = shop();
    let a = shop.product("A", 1, 1_000).await;

    for from in OrderStatus::ALL {
        for to in OrderStatus::ALL {
            if from.can_transition_to(to) {
                continue;
            }

            let buyer = customer(1);
            shop.carts.add_item(&buyer, a, 1).await.unwrap();
            let order = shop.engine.create_order(&buyer).await.unwrap();
            let path: &[OrderStatus] = match from {
                OrderStatus::Pending => &[],
                OrderStatus::Paid => &[OrderStatus::Paid],
                OrderStatus::Shipped => &[OrderStatus::Paid, OrderStatus::Shipped],
                OrderStatus::Completed => &[
                    OrderStatus::Paid,
                    OrderStatus::Shipped,
                    OrderStatus::Completed,
                ],
                OrderStatus::Cancelled => &[OrderStatus::Cancelled],
            };
            for &step in path {
                shop.engine
                    .update_order_status(&admin(), order.id, step)
                    .await
                    .unwrap();
            }

            let err = shop
                .engine
                .update_order_status(&admin(), order.id, to)
                .await
                .unwrap_err();
            assert!(
                matches!(err, ShopError::InvalidStatusChange { .. }),
                "{from} -> {to} must be rejected"
            );
        }
    }
}

#[tokio::test]
async fn update_beyond_stock_leaves_quantity_unchanged() {
    let shop = shop();
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);
    let view = shop.carts.add_item(&buyer, a, 2).await.unwrap();
    let item_id = view.items[0].line.item_id;

    let err = shop
        .carts
        .update_item_quantity(&buyer, item_id, 12)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::ProductNotEnough {
            available: 10,
            requested: 12,
            ..
        }
    ));

    let view = shop.carts.get_cart(&buyer).await.unwrap();
    assert_eq!(view.items[0].line.quantity, 2);

    let view = shop
        .carts
        .update_item_quantity(&buyer, item_id, 10)
        .await
        .unwrap();
    assert_eq!(view.items[0].line.quantity, 10);
}

#[tokio::test]
async fn out_of_stock_lines_are_flagged_but_still_block_checkout() {
    let shop = shop();
    let a = shop.product("A", 10, 5).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 4).await.unwrap();

    let mut tx = shop.store.begin().await.unwrap();
    shop.store.get_product_for_update(&mut tx, a).await.unwrap();
    shop.store.decrease_stock(&mut tx, a, 3).await.unwrap();
    shop.store.commit(tx).await.unwrap();

    let view = shop.carts.get_cart(&buyer).await.unwrap();
    assert!(view.items[0].is_out_of_stock);
    assert!(view.total_price.is_zero());
    assert_eq!(view.total_items, 4);

    let err = shop.engine.create_order(&buyer).await.unwrap_err();
    assert!(matches!(err, ShopError::ProductNotEnough { .. }));
}

#[tokio::test]
async fn blocked_checkout_times_out_without_partial_writes() {
    let shop = shop_with(EngineConfig::with_transaction_timeout(
        Duration::from_millis(100),
    ));
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);
    shop.carts.add_item(&buyer, a, 2).await.unwrap();

    // Someone else holds the product row.
    let mut holder = shop.store.begin().await.unwrap();
    shop.store
        .get_product_for_update(&mut holder, a)
        .await
        .unwrap();

    let err = shop.engine.create_order(&buyer).await.unwrap_err();
    assert!(matches!(err, ShopError::Timeout(_)));

    shop.store.rollback(holder).await.unwrap();

    assert_eq!(shop.store.order_count().await, 0);
    assert_eq!(shop.stock(a).await, 10);
    assert_eq!(shop.carts.get_cart(&buyer).await.unwrap().total_items, 2);

    // The cart lock was released with the abandoned transaction.
    let order = shop.engine.create_order(&buyer).await.unwrap();
    assert_eq!(order.total, Money::from_dollars(20));
}

#[tokio::test]
async fn orders_are_listed_newest_first() {
    let shop = shop();
    let a = shop.product("A", 10, 10).await;
    let buyer = customer(1);

    shop.carts.add_item(&buyer, a, 1).await.unwrap();
    let first = shop.engine.create_order(&buyer).await.unwrap();
    shop.carts.add_item(&buyer, a, 1).await.unwrap();
    let second = shop.engine.create_order(&buyer).await.unwrap();

    let orders = shop.engine.list_my_orders(&buyer).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, second.id);
    assert_eq!(orders[1].id, first.id);
    assert!(shop.engine.list_my_orders(&customer(2)).await.unwrap().is_empty());
    assert_eq!(
        shop.store.get_order(first.id).await.unwrap().user_id,
        UserId::new(1)
    );
}

#[tokio::test]
async fn total_pushed_out_of_range_by_repricing_fails_checkout_cleanly() {
    let shop = shop();
    let a = shop.product("A", 1, i64::from(u32::MAX)).await;
    let b = shop.product("B", 1, 5).await;
    let buyer = customer(1);
    shop.carts
        .add_item(&buyer, a, i64::from(u32::MAX))
        .await
        .unwrap();
    let view = shop.carts.add_item(&buyer, b, 1).await.unwrap();
    let b_item = view
        .items
        .iter()
        .find(|item| item.line.product_id == b)
        .unwrap()
        .line
        .item_id;

    shop.set_price(a, Money::MAX_UNIT_PRICE).await;
    shop.set_price(b, Money::MAX_UNIT_PRICE).await;

    let err = shop.carts.get_cart(&buyer).await.unwrap_err();
    assert!(matches!(err, ShopError::AmountTooLarge));
    let err = shop.engine.create_order(&buyer).await.unwrap_err();
    assert!(matches!(err, ShopError::AmountTooLarge));
    assert_eq!(shop.stock(a).await, u32::MAX);
    assert_eq!(shop.stock(b).await, 5);

    let view = shop.carts.remove_item(&buyer, b_item).await.unwrap();
    assert_eq!(view.items.len(), 1);
    let order = shop.engine.create_order(&buyer).await.unwrap();
    assert_eq!(
        order.total,
        Money::MAX_UNIT_PRICE.checked_multiply(u32::MAX).unwrap()
    );
    assert_eq!(shop.stock(a).await, 0);
}
