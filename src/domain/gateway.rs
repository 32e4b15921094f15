//! Request and response shapes exchanged with a hosted payment gateway.
//!
//! Amounts are integers in the gateway's minor currency units.

use super::money::Currency;
use super::pricing::TaxBehavior;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The gateway call a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStage {
    Product,
    Price,
    Coupon,
    TaxRate,
    Session,
    Retrieve,
}

impl fmt::Display for GatewayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            GatewayStage::Product => "product",
            GatewayStage::Price => "price",
            GatewayStage::Coupon => "coupon",
            GatewayStage::TaxRate => "tax rate",
            GatewayStage::Session => "session",
            GatewayStage::Retrieve => "session retrieval",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayProduct {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRequest {
    pub unit_amount: i64,
    pub currency: Currency,
    pub product: String,
    pub tax_behavior: TaxBehavior,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPrice {
    pub id: String,
    pub unit_amount: i64,
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponValue {
    PercentOff(Decimal),
    AmountOff { amount: i64, currency: Currency },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponDuration {
    Once,
}

impl CouponDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponDuration::Once => "once",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponRequest {
    pub duration: CouponDuration,
    pub value: CouponValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayCoupon {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRateRequest {
    pub percentage: Decimal,
    pub display_name: String,
    pub description: String,
    pub inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayTaxRate {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub price: String,
    pub quantity: u32,
    pub tax_rates: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Payment,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Payment => "payment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub line_items: Vec<LineItem>,
    /// Coupon ids applied to the whole session.
    pub discounts: Vec<String>,
    pub mode: SessionMode,
    pub payment_method_types: Vec<String>,
    pub success_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySession {
    pub id: String,
    pub url: String,
    pub amount_total: i64,
    pub currency: Currency,
    pub payment_status: GatewayPaymentStatus,
}
