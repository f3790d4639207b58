//! Device API error types.

use thiserror::Error;

/// Failures surfaced by a [`DeviceApi`](super::api::DeviceApi)
/// implementation.
#[derive(Debug, Error, Clone)]
pub enum DeviceError {
    #[error("device initialization failed: {0}")]
    InitializationFailed(String),
    #[error("device not found")]
    DeviceNotFound,
    #[error("memory allocation failed: {0}")]
    AllocationFailed(String),
    #[error("memory copy failed: {0}")]
    CopyFailed(String),
    #[error("stream operation failed: {0}")]
    StreamFailed(String),
}

/// Device result type.
pub type DeviceResult<T> = Result<T, DeviceError>;
