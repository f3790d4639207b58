//! HIP runtime backing for the device API.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use super::ffi;
use crate::backend::api::{CopyKind, DeviceApi, StreamHandle};
use crate::backend::error::{DeviceError, DeviceResult};

/// Check whether a usable HIP device is present.
///
/// Lightweight probe: `hipInit` plus a device count. The result is cached;
/// this never crashes when the runtime is installed but no GPU is usable.
pub fn hip_available() -> bool {
    static AVAILABLE: AtomicBool = AtomicBool::new(false);
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let result = std::panic::catch_unwind(|| unsafe {
            if ffi::hipInit(0) != ffi::HIP_SUCCESS {
                tracing::debug!("HIP not available: hipInit failed");
                return false;
            }
            let mut count: i32 = 0;
            if ffi::hipGetDeviceCount(&mut count) != ffi::HIP_SUCCESS {
                tracing::debug!("HIP not available: hipGetDeviceCount failed");
                return false;
            }
            tracing::debug!(count, "HIP device probe");
            count > 0
        })
        .unwrap_or(false);
        AVAILABLE.store(result, Ordering::Release);
    });

    AVAILABLE.load(Ordering::Acquire)
}

fn kind_to_hip(kind: CopyKind) -> i32 {
    match kind {
        CopyKind::HostToDevice => ffi::HIP_MEMCPY_HOST_TO_DEVICE,
        CopyKind::DeviceToHost => ffi::HIP_MEMCPY_DEVICE_TO_HOST,
        CopyKind::DeviceToDevice => ffi::HIP_MEMCPY_DEVICE_TO_DEVICE,
    }
}

/// Device API over the HIP runtime.
///
/// Construction initializes HIP and selects a device; the handle is shared
/// through `Arc` by every region allocated against it.
#[derive(Debug)]
pub struct HipRuntime {
    device_id: i32,
}

impl HipRuntime {
    /// Initialize HIP on device 0.
    pub fn new() -> DeviceResult<Arc<Self>> {
        Self::with_device(0)
    }

    /// Initialize HIP on a specific device.
    pub fn with_device(device_id: i32) -> DeviceResult<Arc<Self>> {
        let result = unsafe { ffi::hipInit(0) };
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::InitializationFailed(format!(
                "hipInit failed with code {}",
                result
            )));
        }

        let mut count: i32 = 0;
        let result = unsafe { ffi::hipGetDeviceCount(&mut count) };
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::InitializationFailed(format!(
                "hipGetDeviceCount failed with code {}",
                result
            )));
        }
        if count == 0 || device_id >= count {
            return Err(DeviceError::DeviceNotFound);
        }

        let result = unsafe { ffi::hipSetDevice(device_id) };
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::InitializationFailed(format!(
                "hipSetDevice({}) failed with code {}",
                device_id, result
            )));
        }

        tracing::debug!(device_id, count, "HIP runtime initialized");
        Ok(Arc::new(HipRuntime { device_id }))
    }

    pub fn device_id(&self) -> i32 {
        self.device_id
    }
}

impl DeviceApi for HipRuntime {
    fn alloc_device(&self, size: usize) -> DeviceResult<*mut c_void> {
        let mut ptr: *mut c_void = ptr::null_mut();
        let result = unsafe { ffi::hipMalloc(&mut ptr, size) };
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::AllocationFailed(format!(
                "hipMalloc failed with code {} for {} bytes",
                result, size
            )));
        }
        if ptr.is_null() && size != 0 {
            return Err(DeviceError::AllocationFailed(format!(
                "hipMalloc returned null pointer for {} bytes",
                size
            )));
        }
        tracing::trace!(size, ?ptr, "hipMalloc");
        Ok(ptr)
    }

    fn free_device(&self, ptr: *mut c_void) {
        if !ptr.is_null() {
            unsafe {
                ffi::hipFree(ptr);
            }
        }
    }

    fn alloc_pinned(&self, size: usize) -> DeviceResult<*mut c_void> {
        let mut ptr: *mut c_void = ptr::null_mut();
        let result = unsafe { ffi::hipHostMalloc(&mut ptr, size, ffi::HIP_HOST_MALLOC_DEFAULT) };
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::AllocationFailed(format!(
                "hipHostMalloc failed with code {} for {} bytes",
                result, size
            )));
        }
        if ptr.is_null() && size != 0 {
            return Err(DeviceError::AllocationFailed(format!(
                "hipHostMalloc returned null pointer for {} bytes",
                size
            )));
        }
        tracing::trace!(size, ?ptr, "hipHostMalloc");
        Ok(ptr)
    }

    fn free_pinned(&self, ptr: *mut c_void) {
        if !ptr.is_null() {
            unsafe {
                ffi::hipHostFree(ptr);
            }
        }
    }

    unsafe fn memcpy_async(
        &self,
        dst: *mut c_void,
        src: *const c_void,
        len: usize,
        kind: CopyKind,
        stream: StreamHandle,
    ) -> DeviceResult<()> {
        let result = ffi::hipMemcpyAsync(dst, src, len, kind_to_hip(kind), stream.as_ptr());
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::CopyFailed(format!(
                "hipMemcpyAsync {:?} failed with code {} ({} bytes)",
                kind, result, len
            )));
        }
        Ok(())
    }

    fn synchronize(&self, stream: StreamHandle) -> DeviceResult<()> {
        let result = unsafe { ffi::hipStreamSynchronize(stream.as_ptr()) };
        if result != ffi::HIP_SUCCESS {
            return Err(DeviceError::StreamFailed(format!(
                "hipStreamSynchronize failed with code {}",
                result
            )));
        }
        Ok(())
    }
}
