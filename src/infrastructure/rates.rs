use crate::domain::money::Currency;
use crate::domain::ports::RateLookup;
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

pub const FIXER_BASE_URL: &str = "http://data.fixer.io/api";

/// One static conversion factor applied to every non-matching currency pair.
#[derive(Debug, Clone, Copy)]
pub struct StaticRate {
    factor: Decimal,
}

impl StaticRate {
    pub fn new(factor: Decimal) -> Result<Self> {
        if factor <= Decimal::ZERO {
            return Err(ShopError::ValidationError(
                "Conversion rate must be positive".to_string(),
            ));
        }
        Ok(Self { factor })
    }
}

#[async_trait]
impl RateLookup for StaticRate {
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal> {
        if from == to {
            Ok(Decimal::ONE)
        } else {
            Ok(self.factor)
        }
    }
}

#[derive(Debug, Deserialize)]
struct FixerResponse {
    success: Option<bool>,
    #[serde(default)]
    rates: HashMap<String, f64>,
    error: Option<FixerErrorBody>,
}

#[derive(Debug, Deserialize)]
struct FixerErrorBody {
    #[serde(default)]
    info: String,
}

/// Live exchange rates from the fixer.io `latest` endpoint.
#[derive(Clone)]
pub struct FixerRateLookup {
    client: reqwest::Client,
    access_key: String,
    base_url: String,
}

impl FixerRateLookup {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self::with_base_url(access_key, FIXER_BASE_URL)
    }

    pub fn with_base_url(access_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_key: access_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RateLookup for FixerRateLookup {
    /// Asks for `from` quoted against `to` and inverts it, giving the amount
    /// of `to` one unit of `from` buys.
    #[instrument(skip(self))]
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        let response = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[
                ("access_key", self.access_key.as_str()),
                ("base", to.iso_code()),
                ("symbols", from.iso_code()),
            ])
            .send()
            .await
            .map_err(|e| ShopError::RateError(format!("fixer request failed: {e}")))?;

        let body: FixerResponse = response
            .json()
            .await
            .map_err(|e| ShopError::RateError(format!("invalid fixer response: {e}")))?;

        if body.success == Some(false) || body.error.is_some() {
            let info = body.error.map(|e| e.info).unwrap_or_default();
            warn!("fixer rejected rate request: {}", info);
            return Err(ShopError::RateError(format!("fixer error: {info}")));
        }

        let quoted = body.rates.get(from.iso_code()).copied().ok_or_else(|| {
            ShopError::RateError(format!("no {} rate in fixer response", from.iso_code()))
        })?;
        let quoted = Decimal::try_from(quoted)
            .map_err(|e| ShopError::RateError(format!("unusable rate {quoted}: {e}")))?;
        if quoted.is_zero() {
            return Err(ShopError::RateError(format!(
                "zero {} rate in fixer response",
                from.iso_code()
            )));
        }

        let rate = Decimal::ONE / quoted;
        debug!(%rate, "fetched live rate");
        Ok(rate)
    }
}
