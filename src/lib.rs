//! rocstage: stream-ordered I/O buffer staging for inference engines on
//! ROCm/HIP.
//!
//! Given an engine execution context's tensor list, [`BufferManager`] sizes
//! and allocates one device region per input and a device + host-pinned pair
//! per output, registers the bound addresses with the context, and stages
//! bytes to and from the device asynchronously on a caller-supplied stream.
//!
//! Transfer calls enqueue and return; the caller owns synchronization:
//! stream sync before reading outputs, and before reusing any input source
//! buffer a pending transfer may still be reading.
//!
//! The HIP runtime itself is behind the `rocm` feature; everything else
//! (sizing, bookkeeping, the engine and device-API seams) builds and tests
//! without a GPU.

pub mod backend;
pub mod engine;
pub mod error;
pub mod staging;
pub mod tensor;

pub use backend::{
    CopyKind, DeviceApi, DeviceError, DeviceRegion, DeviceResult, PinnedRegion, StreamHandle,
};
#[cfg(feature = "rocm")]
pub use backend::{hip_available, HipRuntime, HipStream};
pub use engine::{ExecutionContext, TensorIoMode};
pub use error::{StageError, StageResult};
pub use staging::{BindingOptions, BufferManager, Diagnostics, TracingDiagnostics};
pub use tensor::{volume, DataType, DataTypeTag, Dims, Element, DYNAMIC_DIM};
