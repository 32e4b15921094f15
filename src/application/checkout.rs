use super::currency::{NormalizedPrices, normalize};
use crate::domain::gateway::{
    CouponDuration, CouponRequest, CouponValue, GatewayCoupon, GatewayError, GatewayPrice,
    GatewayStage, GatewayTaxRate, LineItem, PriceRequest, ProductRequest, SessionMode,
    SessionRequest, TaxRateRequest,
};
use crate::domain::item::Basket;
use crate::domain::money::{Currency, MinorUnitRatio};
use crate::domain::order::CheckoutSession;
use crate::domain::ports::{PaymentGatewayRef, RateLookupRef};
use crate::domain::pricing::{Discount, DiscountKind, Tax, TaxBehavior};
use crate::error::{Result, ShopError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, instrument};

pub const DEFAULT_SUCCESS_URL: &str = "https://example.com/success";
pub const DEFAULT_CONVERSION_RATE: Decimal = dec!(0.011);

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub ratio: MinorUnitRatio,
    /// Settlement currency for baskets whose items disagree on currency.
    pub reference_currency: Currency,
    pub success_url: String,
    pub payment_method_types: Vec<String>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            ratio: MinorUnitRatio::CENTS,
            reference_currency: Currency::Usd,
            success_url: DEFAULT_SUCCESS_URL.to_string(),
            payment_method_types: vec!["card".to_string()],
        }
    }
}

fn failed_at(stage: GatewayStage) -> impl FnOnce(GatewayError) -> ShopError {
    move |e| ShopError::GatewayError {
        stage,
        message: e.message,
    }
}

/// Assembles a hosted checkout session from a basket, an optional discount
/// and an optional tax.
///
/// Every gateway object the session needs (products, prices, coupon, tax
/// rate) is created first; any failure aborts the build with the stage it
/// happened in. Objects created before the failure are left on the gateway.
pub struct CheckoutSessionBuilder {
    gateway: PaymentGatewayRef,
    rates: RateLookupRef,
    config: CheckoutConfig,
}

impl CheckoutSessionBuilder {
    pub fn new(gateway: PaymentGatewayRef, rates: RateLookupRef, config: CheckoutConfig) -> Self {
        Self {
            gateway,
            rates,
            config,
        }
    }

    #[instrument(skip_all, fields(items = basket.len(), discount = discount.is_some(), tax = tax.is_some()))]
    pub async fn build(
        &self,
        basket: &Basket,
        discount: Option<&Discount>,
        tax: Option<&Tax>,
    ) -> Result<CheckoutSession> {
        let normalized = normalize(basket, self.config.reference_currency, self.rates.as_ref()).await?;
        let tax_behavior = TaxBehavior::for_tax(tax);

        let prices = self.create_prices(basket, &normalized, tax_behavior).await?;
        let coupon = match discount {
            Some(discount) => Some(self.create_coupon(discount, normalized.currency).await?),
            None => None,
        };
        let tax_rate = match tax {
            Some(tax) => Some(self.create_tax_rate(tax).await?),
            None => None,
        };

        let tax_rates: Vec<String> = tax_rate.into_iter().map(|rate| rate.id).collect();
        let request = SessionRequest {
            line_items: prices
                .into_iter()
                .map(|price| LineItem {
                    price: price.id,
                    quantity: 1,
                    tax_rates: tax_rates.clone(),
                })
                .collect(),
            discounts: coupon.into_iter().map(|coupon| coupon.id).collect(),
            mode: SessionMode::Payment,
            payment_method_types: self.config.payment_method_types.clone(),
            success_url: self.config.success_url.clone(),
        };

        let session = self
            .gateway
            .create_session(request)
            .await
            .map_err(failed_at(GatewayStage::Session))?;
        info!(session = %session.id, amount_total = session.amount_total, currency = %session.currency, "checkout session created");

        Ok(CheckoutSession {
            amount_total: self.config.ratio.from_minor(session.amount_total),
            id: session.id,
            url: session.url,
            currency: session.currency,
        })
    }

    async fn create_prices(
        &self,
        basket: &Basket,
        normalized: &NormalizedPrices,
        tax_behavior: TaxBehavior,
    ) -> Result<Vec<GatewayPrice>> {
        let mut prices = Vec::with_capacity(basket.len());
        for (item, price) in basket.items().iter().zip(&normalized.prices) {
            let product = self
                .gateway
                .create_product(ProductRequest {
                    name: item.name.clone(),
                })
                .await
                .map_err(failed_at(GatewayStage::Product))?;

            let price = self
                .gateway
                .create_price(PriceRequest {
                    unit_amount: self.config.ratio.to_minor(*price)?,
                    currency: normalized.currency,
                    product: product.id,
                    tax_behavior,
                })
                .await
                .map_err(failed_at(GatewayStage::Price))?;
            prices.push(price);
        }
        Ok(prices)
    }

    async fn create_coupon(&self, discount: &Discount, currency: Currency) -> Result<GatewayCoupon> {
        let value = match discount.kind {
            DiscountKind::PercentOff(percent) => CouponValue::PercentOff(percent),
            DiscountKind::AmountOff(amount) => CouponValue::AmountOff {
                amount: self.config.ratio.to_minor(amount)?,
                currency,
            },
        };
        self.gateway
            .create_coupon(CouponRequest {
                duration: CouponDuration::Once,
                value,
            })
            .await
            .map_err(failed_at(GatewayStage::Coupon))
    }

    async fn create_tax_rate(&self, tax: &Tax) -> Result<GatewayTaxRate> {
        let label = format!("Tax {}", tax.name);
        self.gateway
            .create_tax_rate(TaxRateRequest {
                percentage: tax.rate,
                display_name: label.clone(),
                description: label,
                inclusive: false,
            })
            .await
            .map_err(failed_at(GatewayStage::TaxRate))
    }
}
