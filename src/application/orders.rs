use super::checkout::CheckoutSessionBuilder;
use super::reconciler::PaymentReconciler;
use crate::domain::item::{Basket, ItemId};
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{ItemStoreRef, OrderStoreRef};
use crate::domain::pricing::{Discount, Tax};
use crate::error::{Result, ShopError};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub items: Vec<ItemId>,
    pub discount: Option<Discount>,
    pub tax: Option<Tax>,
}

/// Places orders: resolves the requested items, opens a checkout session for
/// them and hands the session to the reconciler.
pub struct OrderService {
    items: ItemStoreRef,
    orders: OrderStoreRef,
    builder: CheckoutSessionBuilder,
    reconciler: Arc<PaymentReconciler>,
}

impl OrderService {
    pub fn new(
        items: ItemStoreRef,
        orders: OrderStoreRef,
        builder: CheckoutSessionBuilder,
        reconciler: Arc<PaymentReconciler>,
    ) -> Self {
        Self {
            items,
            orders,
            builder,
            reconciler,
        }
    }

    /// The order is only persisted once the gateway has accepted its
    /// session, so a stored order always carries its total and currency.
    #[instrument(skip_all, fields(items = ?request.items))]
    pub async fn place_order(&self, request: OrderRequest) -> Result<Order> {
        let basket = self.load_basket(&request.items).await?;
        let session = self
            .builder
            .build(&basket, request.discount.as_ref(), request.tax.as_ref())
            .await?;

        let order_id = self.orders.next_id().await?;
        let mut order = Order::new(order_id, request.items, request.discount, request.tax);
        order.record_checkout(&session);
        self.orders.store(order.clone()).await?;

        self.reconciler.schedule(order_id, &session.id).await?;
        info!(order = %order_id, session = %session.id, "order placed");
        Ok(order)
    }

    pub async fn order(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("Order {order_id}")))
    }

    async fn load_basket(&self, ids: &[ItemId]) -> Result<Basket> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let item = self
                .items
                .get(*id)
                .await?
                .ok_or_else(|| ShopError::NotFound(format!("Item {id}")))?;
            items.push(item);
        }
        Basket::new(items)
    }
}
