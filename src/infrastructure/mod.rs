//! Adapters implementing the domain ports.

pub mod in_memory;
pub mod in_memory_gateway;
pub mod rates;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod stripe;
pub mod task_queue;
