//! Device memory and transfer plumbing.

pub mod api;
pub mod error;
#[cfg(feature = "rocm")]
pub mod hip;
pub mod memory;

pub use api::{CopyKind, DeviceApi, StreamHandle};
pub use error::{DeviceError, DeviceResult};
#[cfg(feature = "rocm")]
pub use hip::{hip_available, HipRuntime, HipStream};
pub use memory::{DeviceRegion, PinnedRegion};
