//! Domain model: items, orders, pricing rules, gateway shapes and the ports
//! the application layer talks through.

pub mod gateway;
pub mod item;
pub mod money;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod task;
