//! Adapter error types.

use regdesk_loader::LoadError;
use thiserror::Error;

/// Errors raised while decoding a query envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Body is not a valid envelope.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        AdapterError::Decode(e.to_string())
    }
}

impl From<AdapterError> for LoadError {
    fn from(e: AdapterError) -> Self {
        LoadError::Operation(e.to_string())
    }
}
