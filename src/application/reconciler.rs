use crate::domain::gateway::{GatewayPaymentStatus, GatewayStage};
use crate::domain::order::OrderId;
use crate::domain::ports::{OrderStoreRef, PaymentGatewayRef, TaskSchedulerRef};
use crate::domain::task::{ScheduledTask, check_task_name, disable_task_name, expiry_task_name};
use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Time between two payment status checks.
    pub interval: Duration,
    /// Delay before the first check.
    pub start_delay: Duration,
    /// How long after session creation checks stop, matching the gateway's
    /// own session expiry.
    pub expiry: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2 * 60),
            start_delay: Duration::from_secs(10),
            expiry: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The gateway has not seen a payment yet.
    Pending,
    /// This check observed the payment and marked the order paid.
    Paid,
    AlreadyPaid,
}

fn after(from: DateTime<Utc>, delay: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| from.checked_add_signed(delay))
        .ok_or_else(|| ShopError::SchedulerError(format!("Delay {delay:?} is out of range")))
}

/// Polls the gateway until an order's checkout session is paid, then stops
/// polling. Polling also stops once the session has expired.
pub struct PaymentReconciler {
    orders: OrderStoreRef,
    gateway: PaymentGatewayRef,
    scheduler: TaskSchedulerRef,
    config: ReconcileConfig,
}

impl PaymentReconciler {
    pub fn new(
        orders: OrderStoreRef,
        gateway: PaymentGatewayRef,
        scheduler: TaskSchedulerRef,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            orders,
            gateway,
            scheduler,
            config,
        }
    }

    /// Registers the recurring status check for a freshly created session and
    /// the one-shot task that disables it on expiry.
    #[instrument(skip(self))]
    pub async fn schedule(&self, order_id: OrderId, session_id: &str) -> Result<()> {
        let now = Utc::now();
        self.scheduler
            .register_recurring(
                &check_task_name(order_id),
                self.config.interval,
                after(now, self.config.start_delay)?,
                ScheduledTask::CheckPayment {
                    order_id,
                    session_id: session_id.to_string(),
                },
            )
            .await?;
        self.scheduler
            .register_once(
                &expiry_task_name(order_id),
                after(now, self.config.expiry)?,
                ScheduledTask::DisableCheck { order_id },
            )
            .await?;
        info!("payment status check scheduled");
        Ok(())
    }

    /// Retrieves the session and, once it is paid, marks the order paid and
    /// registers an immediate disable of the recurring check. The order is
    /// only looked up for a paid session.
    #[instrument(skip(self))]
    pub async fn check_payment(&self, order_id: OrderId, session_id: &str) -> Result<CheckOutcome> {
        let session = self
            .gateway
            .retrieve_session(session_id)
            .await
            .map_err(|e| ShopError::GatewayError {
                stage: GatewayStage::Retrieve,
                message: e.message,
            })?;
        if session.payment_status != GatewayPaymentStatus::Paid {
            debug!(status = ?session.payment_status, "payment not received yet");
            return Ok(CheckOutcome::Pending);
        }

        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("Order {order_id}")))?;
        if !order.mark_paid() {
            return Ok(CheckOutcome::AlreadyPaid);
        }
        self.orders.store(order).await?;
        self.scheduler
            .register_once(
                &disable_task_name(order_id),
                Utc::now(),
                ScheduledTask::DisableCheck { order_id },
            )
            .await?;
        info!("order paid");
        Ok(CheckOutcome::Paid)
    }

    /// Stops the recurring status check. Safe to call more than once.
    #[instrument(skip(self))]
    pub async fn disable_check(&self, order_id: OrderId) -> Result<bool> {
        let cancelled = self.scheduler.cancel(&check_task_name(order_id)).await?;
        if cancelled {
            info!("payment status check disabled");
        }
        Ok(cancelled)
    }

    pub async fn handle(&self, task: ScheduledTask) -> Result<()> {
        match task {
            ScheduledTask::CheckPayment {
                order_id,
                session_id,
            } => self.check_payment(order_id, &session_id).await.map(|_| ()),
            ScheduledTask::DisableCheck { order_id } => {
                self.disable_check(order_id).await.map(|_| ())
            }
        }
    }

    /// Runs due tasks until the queue's sending side is gone. A failing task
    /// is logged and does not stop the worker.
    pub async fn run(&self, mut tasks: mpsc::UnboundedReceiver<ScheduledTask>) {
        while let Some(task) = tasks.recv().await {
            if let Err(e) = self.handle(task.clone()).await {
                error!(?task, "scheduled task failed: {}", e);
            }
        }
    }
}
