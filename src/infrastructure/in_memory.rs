use crate::domain::item::{Item, ItemId};
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{ItemStore, OrderStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for orders.
///
/// Order ids are allocated sequentially starting at 1.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<BTreeMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn store(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn next_id(&self) -> Result<OrderId> {
        let orders = self.orders.read().await;
        let last = orders.keys().next_back().map_or(0, |id| id.0);
        Ok(OrderId(last + 1))
    }
}

/// A thread-safe in-memory item catalog.
#[derive(Default, Clone)]
pub struct InMemoryItemStore {
    items: Arc<RwLock<HashMap<ItemId, Item>>>,
}

impl InMemoryItemStore {
    /// Creates a new, empty in-memory item store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn store(&self, item: Item) -> Result<()> {
        let mut items = self.items.write().await;
        items.insert(item.id, item);
        Ok(())
    }

    async fn get(&self, item_id: ItemId) -> Result<Option<Item>> {
        let items = self.items.read().await;
        Ok(items.get(&item_id).cloned())
    }

    async fn all_items(&self) -> Result<Vec<Item>> {
        let items = self.items.read().await;
        let mut all: Vec<Item> = items.values().cloned().collect();
        all.sort_by_key(|item| item.id);
        Ok(all)
    }
}
