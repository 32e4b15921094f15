use crate::domain::item::Basket;
use crate::domain::money::Currency;
use crate::domain::ports::RateLookup;
use crate::error::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

/// Basket prices expressed in one settlement currency, in basket order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPrices {
    pub currency: Currency,
    pub prices: Vec<Decimal>,
}

/// Brings every item price into one currency.
///
/// A basket that already agrees on a currency is returned unchanged.
/// Otherwise each price is converted into `reference`, looking each distinct
/// currency's rate up only once.
pub async fn normalize(
    basket: &Basket,
    reference: Currency,
    rates: &dyn RateLookup,
) -> Result<NormalizedPrices> {
    if let Some(currency) = basket.single_currency() {
        return Ok(NormalizedPrices {
            currency,
            prices: basket.items().iter().map(|item| item.price.value()).collect(),
        });
    }

    let mut seen: HashMap<Currency, Decimal> = HashMap::new();
    let mut prices = Vec::with_capacity(basket.len());
    for item in basket.items() {
        let rate = match seen.get(&item.currency) {
            Some(rate) => *rate,
            None => {
                let rate = rates.rate(item.currency, reference).await?;
                debug!(from = %item.currency, to = %reference, %rate, "conversion rate");
                seen.insert(item.currency, rate);
                rate
            }
        };
        prices.push(item.price.value() * rate);
    }

    Ok(NormalizedPrices {
        currency: reference,
        prices,
    })
}
