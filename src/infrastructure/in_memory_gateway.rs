use crate::domain::gateway::{
    CouponRequest, CouponValue, GatewayCoupon, GatewayError, GatewayPaymentStatus, GatewayPrice,
    GatewayProduct, GatewaySession, GatewayStage, GatewayTaxRate, PriceRequest, ProductRequest,
    SessionRequest, TaxRateRequest,
};
use crate::domain::ports::PaymentGateway;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Default)]
struct GatewayState {
    counters: HashMap<&'static str, u64>,
    products: HashMap<String, GatewayProduct>,
    prices: Vec<(PriceRequest, GatewayPrice)>,
    coupons: HashMap<String, CouponRequest>,
    tax_rates: HashMap<String, TaxRateRequest>,
    sessions: HashMap<String, (SessionRequest, GatewaySession)>,
    fail_at: Option<GatewayStage>,
    retrievals: u64,
}

impl GatewayState {
    fn next_id(&mut self, prefix: &'static str) -> String {
        let counter = self.counters.entry(prefix).or_default();
        *counter += 1;
        format!("{prefix}_{counter}")
    }

    fn check(&self, stage: GatewayStage) -> GatewayResult<()> {
        match self.fail_at {
            Some(failing) if failing == stage => {
                Err(GatewayError::new(format!("simulated {stage} failure")))
            }
            _ => Ok(()),
        }
    }

    fn price(&self, id: &str) -> GatewayResult<&GatewayPrice> {
        self.prices
            .iter()
            .map(|(_, price)| price)
            .find(|price| price.id == id)
            .ok_or_else(|| GatewayError::new(format!("No such price: '{id}'")))
    }
}

/// A self-contained payment gateway that keeps every object in memory.
///
/// Totals follow hosted-checkout semantics: the coupon applies to the
/// subtotal and exclusive tax rates are added on the discounted amount.
/// Sessions start unpaid until [`InMemoryGateway::mark_paid`] is called.
#[derive(Default, Clone)]
pub struct InMemoryGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call at `stage` fail.
    pub async fn fail_at(&self, stage: GatewayStage) {
        self.state.write().await.fail_at = Some(stage);
    }

    /// Simulates the customer completing payment. Returns `false` for an
    /// unknown session.
    pub async fn mark_paid(&self, session_id: &str) -> bool {
        let mut state = self.state.write().await;
        match state.sessions.get_mut(session_id) {
            Some((_, session)) => {
                session.payment_status = GatewayPaymentStatus::Paid;
                true
            }
            None => false,
        }
    }

    pub async fn session_request(&self, session_id: &str) -> Option<SessionRequest> {
        let state = self.state.read().await;
        state
            .sessions
            .get(session_id)
            .map(|(request, _)| request.clone())
    }

    pub async fn price_requests(&self) -> Vec<PriceRequest> {
        let state = self.state.read().await;
        state
            .prices
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub async fn coupon_requests(&self) -> Vec<CouponRequest> {
        let state = self.state.read().await;
        state.coupons.values().cloned().collect()
    }

    pub async fn tax_rate_requests(&self) -> Vec<TaxRateRequest> {
        let state = self.state.read().await;
        state.tax_rates.values().cloned().collect()
    }

    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }

    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Number of session status lookups served so far.
    pub async fn retrievals(&self) -> u64 {
        self.state.read().await.retrievals
    }
}

fn percent_of(amount: i64, percent: Decimal) -> GatewayResult<i64> {
    (Decimal::from(amount) * percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| GatewayError::new("Amount is out of range"))
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_product(&self, request: ProductRequest) -> GatewayResult<GatewayProduct> {
        let mut state = self.state.write().await;
        state.check(GatewayStage::Product)?;
        if request.name.trim().is_empty() {
            return Err(GatewayError::new("Product name must not be empty"));
        }

        let product = GatewayProduct {
            id: state.next_id("prod"),
            name: request.name,
        };
        state.products.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn create_price(&self, request: PriceRequest) -> GatewayResult<GatewayPrice> {
        let mut state = self.state.write().await;
        state.check(GatewayStage::Price)?;
        if !state.products.contains_key(&request.product) {
            return Err(GatewayError::new(format!(
                "No such product: '{}'",
                request.product
            )));
        }
        if request.unit_amount < 0 {
            return Err(GatewayError::new("unit_amount must not be negative"));
        }

        let price = GatewayPrice {
            id: state.next_id("price"),
            unit_amount: request.unit_amount,
            currency: request.currency,
        };
        state.prices.push((request, price.clone()));
        Ok(price)
    }

    async fn create_coupon(&self, request: CouponRequest) -> GatewayResult<GatewayCoupon> {
        let mut state = self.state.write().await;
        state.check(GatewayStage::Coupon)?;

        let coupon = GatewayCoupon {
            id: state.next_id("coupon"),
        };
        state.coupons.insert(coupon.id.clone(), request);
        Ok(coupon)
    }

    async fn create_tax_rate(&self, request: TaxRateRequest) -> GatewayResult<GatewayTaxRate> {
        let mut state = self.state.write().await;
        state.check(GatewayStage::TaxRate)?;

        let tax_rate = GatewayTaxRate {
            id: state.next_id("txr"),
        };
        state.tax_rates.insert(tax_rate.id.clone(), request);
        Ok(tax_rate)
    }

    async fn create_session(&self, request: SessionRequest) -> GatewayResult<GatewaySession> {
        let mut state = self.state.write().await;
        state.check(GatewayStage::Session)?;

        let Some(first) = request.line_items.first() else {
            return Err(GatewayError::new("line_items must not be empty"));
        };
        let currency = state.price(&first.price)?.currency;

        let mut subtotal: i64 = 0;
        for line in &request.line_items {
            let price = state.price(&line.price)?;
            if price.currency != currency {
                return Err(GatewayError::new(
                    "All line items must share the same currency",
                ));
            }
            subtotal += price.unit_amount * i64::from(line.quantity);
        }

        let mut discount: i64 = 0;
        for coupon_id in &request.discounts {
            let coupon = state
                .coupons
                .get(coupon_id)
                .ok_or_else(|| GatewayError::new(format!("No such coupon: '{coupon_id}'")))?;
            discount += match coupon.value {
                CouponValue::PercentOff(percent) => percent_of(subtotal, percent)?,
                CouponValue::AmountOff {
                    amount,
                    currency: coupon_currency,
                } => {
                    if coupon_currency != currency {
                        return Err(GatewayError::new(
                            "Coupon currency does not match the session currency",
                        ));
                    }
                    amount
                }
            };
        }
        let discounted = (subtotal - discount).max(0);

        // Line items share one tax rate set, so tax is computed once on the
        // discounted amount.
        let mut tax: i64 = 0;
        for tax_rate_id in &first.tax_rates {
            let tax_rate = state
                .tax_rates
                .get(tax_rate_id)
                .ok_or_else(|| GatewayError::new(format!("No such tax rate: '{tax_rate_id}'")))?;
            if !tax_rate.inclusive {
                tax += percent_of(discounted, tax_rate.percentage)?;
            }
        }

        let id = state.next_id("cs_test");
        let session = GatewaySession {
            url: format!("https://checkout.example.com/c/pay/{id}"),
            id,
            amount_total: discounted + tax,
            currency,
            payment_status: GatewayPaymentStatus::Unpaid,
        };
        state
            .sessions
            .insert(session.id.clone(), (request, session.clone()));
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> GatewayResult<GatewaySession> {
        let mut state = self.state.write().await;
        state.check(GatewayStage::Retrieve)?;
        state.retrievals += 1;
        state
            .sessions
            .get(session_id)
            .map(|(_, session)| session.clone())
            .ok_or_else(|| GatewayError::new(format!("No such checkout.session: '{session_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::{CouponDuration, LineItem, SessionMode};
    use crate::domain::money::Currency;
    use crate::domain::pricing::TaxBehavior;
    use rust_decimal_macros::dec;

    async fn price(gateway: &InMemoryGateway, amount: i64, currency: Currency) -> String {
        let product = gateway
            .create_product(ProductRequest {
                name: "Mug".to_string(),
            })
            .await
            .unwrap();
        gateway
            .create_price(PriceRequest {
                unit_amount: amount,
                currency,
                product: product.id,
                tax_behavior: TaxBehavior::Exclusive,
            })
            .await
            .unwrap()
            .id
    }

    fn session(prices: Vec<String>, tax_rates: Vec<String>, discounts: Vec<String>) -> SessionRequest {
        SessionRequest {
            line_items: prices
                .into_iter()
                .map(|price| LineItem {
                    price,
                    quantity: 1,
                    tax_rates: tax_rates.clone(),
                })
                .collect(),
            discounts,
            mode: SessionMode::Payment,
            payment_method_types: vec!["card".to_string()],
            success_url: "https://example.com/success".to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_total_with_coupon_and_tax() {
        let gateway = InMemoryGateway::new();
        let a = price(&gateway, 1000, Currency::Usd).await;
        let b = price(&gateway, 1000, Currency::Usd).await;
        let coupon = gateway
            .create_coupon(CouponRequest {
                duration: CouponDuration::Once,
                value: CouponValue::PercentOff(dec!(10)),
            })
            .await
            .unwrap();
        let tax = gateway
            .create_tax_rate(TaxRateRequest {
                percentage: dec!(20),
                display_name: "Tax VAT".to_string(),
                description: "Tax VAT".to_string(),
                inclusive: false,
            })
            .await
            .unwrap();

        let session = gateway
            .create_session(session(vec![a, b], vec![tax.id], vec![coupon.id]))
            .await
            .unwrap();

        // 2000 - 10% = 1800, + 20% tax = 2160
        assert_eq!(session.amount_total, 2160);
        assert_eq!(session.currency, Currency::Usd);
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(session.payment_status, GatewayPaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_session_rejects_mixed_currencies() {
        let gateway = InMemoryGateway::new();
        let a = price(&gateway, 1000, Currency::Usd).await;
        let b = price(&gateway, 1000, Currency::Rub).await;

        let result = gateway.create_session(session(vec![a, b], vec![], vec![])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mark_paid_and_retrieve() {
        let gateway = InMemoryGateway::new();
        let a = price(&gateway, 500, Currency::Eur).await;
        let created = gateway
            .create_session(session(vec![a], vec![], vec![]))
            .await
            .unwrap();

        assert!(gateway.mark_paid(&created.id).await);
        assert!(!gateway.mark_paid("cs_test_missing").await);

        let retrieved = gateway.retrieve_session(&created.id).await.unwrap();
        assert_eq!(retrieved.payment_status, GatewayPaymentStatus::Paid);
        assert_eq!(gateway.retrievals().await, 1);
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let gateway = InMemoryGateway::new();
        gateway.fail_at(GatewayStage::Product).await;

        let result = gateway
            .create_product(ProductRequest {
                name: "Mug".to_string(),
            })
            .await;
        assert_eq!(
            result,
            Err(GatewayError::new("simulated product failure"))
        );
    }
}
