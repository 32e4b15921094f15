//! Application layer containing the checkout and reconciliation workflows.
//!
//! `OrderService` is the entry point for placing orders. It builds checkout
//! sessions through `CheckoutSessionBuilder` and hands them to the
//! `PaymentReconciler`, whose scheduled tasks arrive over a `tokio` channel
//! and are run by its worker loop.

pub mod checkout;
pub mod currency;
pub mod orders;
pub mod reconciler;
