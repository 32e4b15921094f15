use super::item::ItemId;
use super::money::Currency;
use super::pricing::{Discount, Tax};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u32);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => f.write_str("unpaid"),
            PaymentStatus::Paid => f.write_str("paid"),
        }
    }
}

/// A checkout session the gateway accepted, with its total converted back
/// from minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub amount_total: Decimal,
    pub currency: Currency,
}

/// A customer order.
///
/// `total_price`, `currency` and the session fields stay empty until a
/// checkout session has been created. The payment status only ever moves
/// from unpaid to paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<ItemId>,
    pub discount: Option<Discount>,
    pub tax: Option<Tax>,
    pub total_price: Option<Decimal>,
    pub currency: Option<Currency>,
    pub session_id: Option<String>,
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
    payment_status: PaymentStatus,
}

impl Order {
    pub fn new(
        id: OrderId,
        items: Vec<ItemId>,
        discount: Option<Discount>,
        tax: Option<Tax>,
    ) -> Self {
        Self {
            id,
            items,
            discount,
            tax,
            total_price: None,
            currency: None,
            session_id: None,
            checkout_url: None,
            created_at: Utc::now(),
            payment_status: PaymentStatus::Unpaid,
        }
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn record_checkout(&mut self, session: &CheckoutSession) {
        self.total_price = Some(session.amount_total);
        self.currency = Some(session.currency);
        self.session_id = Some(session.id.clone());
        self.checkout_url = Some(session.url.clone());
    }

    /// Marks the order paid. Returns `false` when it already was.
    pub fn mark_paid(&mut self) -> bool {
        if self.is_paid() {
            return false;
        }
        self.payment_status = PaymentStatus::Paid;
        true
    }
}
