use super::gateway::{
    CouponRequest, GatewayCoupon, GatewayError, GatewayPrice, GatewayProduct, GatewaySession,
    GatewayTaxRate, PriceRequest, ProductRequest, SessionRequest, TaxRateRequest,
};
use super::item::{Item, ItemId};
use super::money::Currency;
use super::order::{Order, OrderId};
use super::task::ScheduledTask;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_product(
        &self,
        request: ProductRequest,
    ) -> std::result::Result<GatewayProduct, GatewayError>;
    async fn create_price(
        &self,
        request: PriceRequest,
    ) -> std::result::Result<GatewayPrice, GatewayError>;
    async fn create_coupon(
        &self,
        request: CouponRequest,
    ) -> std::result::Result<GatewayCoupon, GatewayError>;
    async fn create_tax_rate(
        &self,
        request: TaxRateRequest,
    ) -> std::result::Result<GatewayTaxRate, GatewayError>;
    async fn create_session(
        &self,
        request: SessionRequest,
    ) -> std::result::Result<GatewaySession, GatewayError>;
    async fn retrieve_session(
        &self,
        session_id: &str,
    ) -> std::result::Result<GatewaySession, GatewayError>;
}

/// Multiplicative rate converting an amount in `from` into `to`.
#[async_trait]
pub trait RateLookup: Send + Sync {
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal>;
}

#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn register_recurring(
        &self,
        name: &str,
        every: Duration,
        start_at: DateTime<Utc>,
        task: ScheduledTask,
    ) -> Result<()>;
    async fn register_once(
        &self,
        name: &str,
        fire_at: DateTime<Utc>,
        task: ScheduledTask,
    ) -> Result<()>;
    /// Disables a task by name. Returns whether an active task was stopped.
    async fn cancel(&self, name: &str) -> Result<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn store(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;
    async fn next_id(&self) -> Result<OrderId>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn store(&self, item: Item) -> Result<()>;
    async fn get(&self, item_id: ItemId) -> Result<Option<Item>>;
    async fn all_items(&self) -> Result<Vec<Item>>;
}

pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type RateLookupRef = Arc<dyn RateLookup>;
pub type TaskSchedulerRef = Arc<dyn TaskScheduler>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type ItemStoreRef = Arc<dyn ItemStore>;
