use crate::domain::gateway::GatewayStage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// A payment gateway call failed while building or checking a session.
    #[error("Error during gateway {stage} call: {message}")]
    GatewayError { stage: GatewayStage, message: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("Rate lookup error: {0}")]
    RateError(String),
    #[error("Scheduler error: {0}")]
    SchedulerError(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, ShopError>;
