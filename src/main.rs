use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use shopfront::application::checkout::{
    CheckoutConfig, CheckoutSessionBuilder, DEFAULT_CONVERSION_RATE, DEFAULT_SUCCESS_URL,
};
use shopfront::application::orders::{OrderRequest, OrderService};
use shopfront::application::reconciler::{PaymentReconciler, ReconcileConfig};
use shopfront::domain::item::ItemId;
use shopfront::domain::money::MinorUnitRatio;
use shopfront::domain::ports::{
    ItemStore, ItemStoreRef, OrderStoreRef, PaymentGatewayRef, RateLookupRef,
};
use shopfront::domain::pricing::{Discount, Tax};
use shopfront::domain::task::check_task_name;
use shopfront::infrastructure::in_memory::{InMemoryItemStore, InMemoryOrderStore};
use shopfront::infrastructure::in_memory_gateway::InMemoryGateway;
use shopfront::infrastructure::rates::{FixerRateLookup, StaticRate};
#[cfg(feature = "storage-rocksdb")]
use shopfront::infrastructure::rocksdb::RocksDBStore;
use shopfront::infrastructure::stripe::StripeGateway;
use shopfront::infrastructure::task_queue::TokioTaskQueue;
use shopfront::interfaces::csv::item_reader::ItemReader;
use shopfront::interfaces::csv::order_writer::OrderWriter;
use shopfront::telemetry;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const WATCH_POLL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Item catalog CSV file (id,name,description,price,currency)
    #[arg(long)]
    items: PathBuf,

    /// Id of an item to order. Repeat to order several items.
    #[arg(long = "item", required = true)]
    item_ids: Vec<u32>,

    /// Percentage discount applied once to the whole order
    #[arg(long, conflicts_with = "amount_off")]
    percent_off: Option<Decimal>,

    /// Fixed discount in the reference currency, applied once
    #[arg(long)]
    amount_off: Option<Decimal>,

    #[arg(long, default_value = "Promo")]
    discount_name: String,

    /// Tax rate in percent, charged on top of the prices
    #[arg(long)]
    tax_rate: Option<Decimal>,

    #[arg(long, default_value = "VAT")]
    tax_name: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Stripe secret key. Without it, sessions are created on an in-memory gateway.
    #[arg(long, env = "STRIPE_API_KEY", hide_env_values = true)]
    stripe_key: Option<String>,

    /// fixer.io access key. Without it, a fixed conversion rate is used.
    #[arg(long, env = "FIXER_API_KEY", hide_env_values = true)]
    fixer_key: Option<String>,

    /// Fixed rate into the reference currency, used when no fixer.io key is set
    #[arg(long, default_value_t = DEFAULT_CONVERSION_RATE)]
    conversion_rate: Decimal,

    /// Minor units per major currency unit
    #[arg(long, default_value_t = 100)]
    currency_ratio: u32,

    #[arg(long, default_value = DEFAULT_SUCCESS_URL)]
    success_url: String,

    #[arg(long, default_value_t = 120)]
    poll_interval_secs: u64,

    #[arg(long, default_value_t = 10)]
    start_delay_secs: u64,

    /// Seconds after which payment checks for a session stop
    #[arg(long, default_value_t = 30 * 60)]
    expiry_secs: u64,

    /// Keep running until the order is paid or its checks expire, then
    /// print the final order state.
    #[arg(long)]
    watch: bool,
}

impl Cli {
    fn discount(&self) -> Result<Option<Discount>> {
        if self.percent_off.is_none() && self.amount_off.is_none() {
            return Ok(None);
        }
        Discount::new(&self.discount_name, self.percent_off, self.amount_off)
            .map(Some)
            .into_diagnostic()
    }

    fn tax(&self) -> Result<Option<Tax>> {
        self.tax_rate
            .map(|rate| Tax::new(&self.tax_name, rate))
            .transpose()
            .into_diagnostic()
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<(ItemStoreRef, OrderStoreRef)> {
    if let Some(db_path) = db_path {
        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        return Ok((Arc::new(store.clone()), Arc::new(store)));
    }
    Ok((
        Arc::new(InMemoryItemStore::new()),
        Arc::new(InMemoryOrderStore::new()),
    ))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<(ItemStoreRef, OrderStoreRef)> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok((
        Arc::new(InMemoryItemStore::new()),
        Arc::new(InMemoryOrderStore::new()),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();
    let discount = cli.discount()?;
    let tax = cli.tax()?;

    let (items, orders) = open_stores(cli.db_path.clone())?;

    // Load the catalog
    let file = File::open(&cli.items).into_diagnostic()?;
    for item_result in ItemReader::new(file).items() {
        match item_result {
            Ok(item) => items.store(item).await.into_diagnostic()?,
            Err(e) => error!("Error reading item: {}", e),
        }
    }
    let catalog = items.all_items().await.into_diagnostic()?;
    info!(items = catalog.len(), "catalog loaded");

    let gateway: PaymentGatewayRef = match &cli.stripe_key {
        Some(key) => Arc::new(StripeGateway::new(key.clone())),
        None => {
            info!("no Stripe key configured, using the in-memory gateway");
            Arc::new(InMemoryGateway::new())
        }
    };
    let rates: RateLookupRef = match &cli.fixer_key {
        Some(key) => Arc::new(FixerRateLookup::new(key.clone())),
        None => Arc::new(StaticRate::new(cli.conversion_rate).into_diagnostic()?),
    };

    let checkout = CheckoutConfig {
        ratio: MinorUnitRatio::new(cli.currency_ratio).into_diagnostic()?,
        success_url: cli.success_url.clone(),
        ..CheckoutConfig::default()
    };
    let reconcile = ReconcileConfig {
        interval: Duration::from_secs(cli.poll_interval_secs),
        start_delay: Duration::from_secs(cli.start_delay_secs),
        expiry: Duration::from_secs(cli.expiry_secs),
    };

    let (queue, tasks) = TokioTaskQueue::new();
    let reconciler = Arc::new(PaymentReconciler::new(
        orders.clone(),
        gateway.clone(),
        Arc::new(queue.clone()),
        reconcile,
    ));
    let worker = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.run(tasks).await })
    };

    let builder = CheckoutSessionBuilder::new(gateway, rates, checkout);
    let service = OrderService::new(items, orders, builder, reconciler);

    let request = OrderRequest {
        items: cli.item_ids.iter().copied().map(ItemId).collect(),
        discount,
        tax,
    };
    let mut order = service.place_order(request).await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders([&order]).into_diagnostic()?;

    if cli.watch {
        let check = check_task_name(order.id);
        while !order.is_paid() && queue.is_enabled(&check).await {
            tokio::time::sleep(WATCH_POLL).await;
            order = service.order(order.id).await.into_diagnostic()?;
        }
        info!(order = %order.id, status = %order.payment_status(), "stopped watching");
        writer.write_orders([&order]).into_diagnostic()?;
    }

    worker.abort();
    Ok(())
}
