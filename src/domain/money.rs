use crate::error::{Result, ShopError};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currencies an item can be priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Eur,
    Rub,
}

impl Currency {
    /// Lowercase code, as the payment gateway expects it.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Rub => "rub",
        }
    }

    /// Uppercase ISO 4217 code, as exchange-rate services expect it.
    pub fn iso_code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Rub => "RUB",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Currency::Usd),
            "eur" => Ok(Currency::Eur),
            "rub" => Ok(Currency::Rub),
            other => Err(ShopError::ValidationError(format!(
                "Unsupported currency: {other}"
            ))),
        }
    }
}

/// A non-negative item price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ShopError::ValidationError(
                "Price must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = ShopError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// Multiplier between a decimal amount and the gateway's integer minor units
/// (100 cents to the dollar, 100 kopecks to the rouble).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinorUnitRatio(u32);

impl MinorUnitRatio {
    pub const CENTS: Self = Self(100);

    pub fn new(ratio: u32) -> Result<Self> {
        if ratio == 0 {
            return Err(ShopError::ValidationError(
                "Smallest currency unit ratio must be positive".to_string(),
            ));
        }
        Ok(Self(ratio))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Converts a decimal amount into whole minor units, dropping any
    /// fraction of a minor unit.
    pub fn to_minor(&self, amount: Decimal) -> Result<i64> {
        (amount * Decimal::from(self.0))
            .trunc()
            .to_i64()
            .ok_or_else(|| {
                ShopError::ValidationError(format!("Amount {amount} is out of range"))
            })
    }

    pub fn from_minor(&self, minor: i64) -> Decimal {
        (Decimal::from(minor) / Decimal::from(self.0)).normalize()
    }
}

impl Default for MinorUnitRatio {
    fn default() -> Self {
        Self::CENTS
    }
}
