use claimpilot_engine::{AdminError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("No payout schedule recorded for {0} (the wallet has not approved anything yet)")]
    NoSchedule(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    #[error("IO Error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::IoError(e.to_string())
    }
}
