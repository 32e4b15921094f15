use crate::error::{Result, ShopError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The value of a discount: a percentage or a fixed amount, never both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    PercentOff(Decimal),
    /// Expressed in the settlement currency of the checkout it is applied to.
    AmountOff(Decimal),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DiscountRecord")]
pub struct Discount {
    pub name: String,
    pub kind: DiscountKind,
}

/// Stored form of a [`Discount`], validated on the way back in.
#[derive(Deserialize)]
struct DiscountRecord {
    name: String,
    kind: DiscountKind,
}

impl TryFrom<DiscountRecord> for Discount {
    type Error = ShopError;

    fn try_from(record: DiscountRecord) -> Result<Self> {
        match record.kind {
            DiscountKind::PercentOff(percent) => Self::percent_off(record.name, percent),
            DiscountKind::AmountOff(amount) => Self::amount_off(record.name, amount),
        }
    }
}

impl Discount {
    /// Builds a discount from the two optional fields a form or import
    /// provides. Exactly one of them must be set.
    pub fn new(
        name: impl Into<String>,
        percent_off: Option<Decimal>,
        amount_off: Option<Decimal>,
    ) -> Result<Self> {
        match (percent_off, amount_off) {
            (Some(percent), None) => Self::percent_off(name, percent),
            (None, Some(amount)) => Self::amount_off(name, amount),
            (Some(_), Some(_)) => Err(ShopError::ValidationError(
                "Either percent_off or amount_off should be specified, not both".to_string(),
            )),
            (None, None) => Err(ShopError::ValidationError(
                "Either percent_off or amount_off should be specified".to_string(),
            )),
        }
    }

    pub fn percent_off(name: impl Into<String>, percent: Decimal) -> Result<Self> {
        if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(ShopError::ValidationError(format!(
                "percent_off must be within (0, 100], got {percent}"
            )));
        }
        Ok(Self {
            name: name.into(),
            kind: DiscountKind::PercentOff(percent),
        })
    }

    pub fn amount_off(name: impl Into<String>, amount: Decimal) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(ShopError::ValidationError(format!(
                "amount_off must be positive, got {amount}"
            )));
        }
        Ok(Self {
            name: name.into(),
            kind: DiscountKind::AmountOff(amount),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaxRecord")]
pub struct Tax {
    pub name: String,
    /// Percentage, e.g. `20` for 20%.
    pub rate: Decimal,
}

#[derive(Deserialize)]
struct TaxRecord {
    name: String,
    rate: Decimal,
}

impl TryFrom<TaxRecord> for Tax {
    type Error = ShopError;

    fn try_from(record: TaxRecord) -> Result<Self> {
        Self::new(record.name, record.rate)
    }
}

impl Tax {
    pub fn new(name: impl Into<String>, rate: Decimal) -> Result<Self> {
        if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
            return Err(ShopError::ValidationError(format!(
                "Tax rate must be within [0, 100], got {rate}"
            )));
        }
        Ok(Self {
            name: name.into(),
            rate,
        })
    }
}

/// Whether prices already include tax or have it added on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxBehavior {
    Inclusive,
    Exclusive,
}

impl TaxBehavior {
    pub fn for_tax(tax: Option<&Tax>) -> Self {
        match tax {
            Some(_) => TaxBehavior::Exclusive,
            None => TaxBehavior::Inclusive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxBehavior::Inclusive => "inclusive",
            TaxBehavior::Exclusive => "exclusive",
        }
    }
}
