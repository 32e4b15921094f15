use crate::domain::item::{Item, ItemId};
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{ItemStore, OrderStore};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing catalog items.
pub const CF_ITEMS: &str = "items";

/// A persistent store implementation using RocksDB.
///
/// Orders and items live in separate Column Families, JSON-encoded and keyed
/// by their big-endian id so iteration follows id order.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("orders" and "items") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let cf_items = ColumnFamilyDescriptor::new(CF_ITEMS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders, cf_items])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            ShopError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn store(&self, order: Order) -> Result<()> {
        let cf = self.cf(CF_ORDERS)?;
        let value = serde_json::to_vec(&order)?;
        self.db.put_cf(cf, order.id.0.to_be_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let cf = self.cf(CF_ORDERS)?;
        match self.db.get_cf(cf, order_id.0.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn next_id(&self) -> Result<OrderId> {
        let cf = self.cf(CF_ORDERS)?;
        let last = match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(entry) => {
                let (key, _) = entry?;
                let key: [u8; 4] = key.as_ref().try_into().map_err(|_| {
                    ShopError::InternalError(Box::new(std::io::Error::other(
                        "Malformed order key",
                    )))
                })?;
                u32::from_be_bytes(key)
            }
            None => 0,
        };
        Ok(OrderId(last + 1))
    }
}

#[async_trait]
impl ItemStore for RocksDBStore {
    async fn store(&self, item: Item) -> Result<()> {
        let cf = self.cf(CF_ITEMS)?;
        let value = serde_json::to_vec(&item)?;
        self.db.put_cf(cf, item.id.0.to_be_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, item_id: ItemId) -> Result<Option<Item>> {
        let cf = self.cf(CF_ITEMS)?;
        match self.db.get_cf(cf, item_id.0.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn all_items(&self) -> Result<Vec<Item>> {
        let cf = self.cf(CF_ITEMS)?;
        let mut items = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = entry?;
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }
}
