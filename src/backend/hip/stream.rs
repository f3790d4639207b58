//! HIP stream wrapper.

use std::ptr;

use super::ffi;
use crate::backend::api::StreamHandle;
use crate::backend::error::{DeviceError, DeviceResult};

// SAFETY: HipStream only contains a raw pointer to a runtime-owned queue;
// the runtime serializes work enqueued through it.
// NOTE: HipStream does NOT implement Clone because cloning the raw pointer
// would cause double-destroy when both instances are dropped.
unsafe impl Send for HipStream {}
unsafe impl Sync for HipStream {}

/// Owned HIP stream.
///
/// Transfer operations take the copyable [`StreamHandle`] from
/// [`handle`](HipStream::handle); the stream itself stays owned here and is
/// destroyed on drop.
#[derive(Debug)]
pub struct HipStream {
    stream: *mut std::ffi::c_void,
}

impl HipStream {
    /// Create a new HIP stream.
    pub fn new() -> DeviceResult<Self> {
        let mut stream: *mut std::ffi::c_void = ptr::null_mut();

        let result = unsafe { ffi::hipStreamCreate(&mut stream) };
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::StreamFailed(format!(
                "hipStreamCreate failed with code {}",
                result
            )));
        }
        if stream.is_null() {
            return Err(DeviceError::StreamFailed(
                "hipStreamCreate returned null pointer".to_string(),
            ));
        }

        tracing::debug!(?stream, "HIP stream created");
        Ok(HipStream { stream })
    }

    /// Block until all work enqueued on this stream has completed.
    pub fn synchronize(&self) -> DeviceResult<()> {
        let result = unsafe { ffi::hipStreamSynchronize(self.stream) };
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::StreamFailed(format!(
                "hipStreamSynchronize failed with code {}",
                result
            )));
        }
        Ok(())
    }

    /// The copyable token transfer operations are ordered on.
    pub fn handle(&self) -> StreamHandle {
        StreamHandle::from_raw(self.stream)
    }
}

impl Drop for HipStream {
    fn drop(&mut self) {
        if !self.stream.is_null() {
            unsafe {
                ffi::hipStreamDestroy(self.stream);
            }
        }
    }
}
