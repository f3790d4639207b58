//! Crate-level error handling.
//!
//! Construction-time violations (unsupported element type, inconsistent
//! shape, resource exhaustion) are fatal: no partially-initialized manager is
//! ever handed to a caller. Regions allocated before the failure are released
//! by their own teardown. The checked output views report their violations
//! here as well; the unchecked view deliberately does not.

use thiserror::Error;

use crate::backend::DeviceError;
use crate::tensor::DataType;

#[derive(Debug, Error)]
pub enum StageError {
    // ========== Construction errors ==========
    /// The engine reported an element type outside the supported set.
    #[error("unsupported element type tag {tag} for tensor '{tensor}'")]
    UnsupportedDataType { tensor: String, tag: i32 },

    /// A negative extent survived dynamic-dimension resolution.
    #[error("invalid extent {extent} on axis {axis} of tensor '{tensor}'")]
    InvalidDimension {
        tensor: String,
        axis: usize,
        extent: i64,
    },

    /// Allocation or transfer failure from the device API.
    #[error(transparent)]
    Device(#[from] DeviceError),

    // ========== Checked output-view errors ==========
    #[error("output index {index} out of range ({count} outputs)")]
    OutputIndexOutOfRange { index: usize, count: usize },

    #[error("output {index} holds {declared:?} elements, view requested {requested:?}")]
    OutputViewTypeMismatch {
        index: usize,
        declared: DataType,
        requested: DataType,
    },

    #[error("output view needs {need} bytes but region {index} holds {have}")]
    OutputViewTooLarge {
        index: usize,
        need: usize,
        have: usize,
    },

    #[error("output region {index} is not aligned for the requested element type")]
    OutputViewMisaligned { index: usize },
}

pub type StageResult<T> = Result<T, StageError>;
