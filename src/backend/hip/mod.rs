//! ROCm/HIP implementation of the device API.

pub(crate) mod ffi;
mod runtime;
mod stream;

pub use runtime::{hip_available, HipRuntime};
pub use stream::HipStream;
