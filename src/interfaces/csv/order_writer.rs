use crate::domain::order::Order;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OrderRow<'a> {
    order: u32,
    session: &'a str,
    url: &'a str,
    total: String,
    currency: &'a str,
    status: String,
}

impl<'a> From<&'a Order> for OrderRow<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            order: order.id.0,
            session: order.session_id.as_deref().unwrap_or_default(),
            url: order.checkout_url.as_deref().unwrap_or_default(),
            total: order
                .total_price
                .map(|total| total.normalize().to_string())
                .unwrap_or_default(),
            currency: order.currency.map(|c| c.code()).unwrap_or_default(),
            status: order.payment_status().to_string(),
        }
    }
}

/// Writes orders as CSV rows: `order,session,url,total,currency,status`.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        for order in orders {
            self.writer.serialize(OrderRow::from(order))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
