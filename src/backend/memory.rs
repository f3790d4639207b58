//! Owned memory regions for tensor staging.
//!
//! Two scoped-resource kinds, one per heap: [`DeviceRegion`] (device-resident)
//! and [`PinnedRegion`] (host-pinned). Each owns its allocation exclusively
//! (regions are not clonable and are never shared across sessions) and each
//! releases it exactly once, with the primitive matching the one that
//! acquired it.

use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

use super::api::DeviceApi;
use super::error::DeviceResult;

/// Device-resident allocation, freed with the device primitive on drop.
pub struct DeviceRegion {
    api: Arc<dyn DeviceApi>,
    ptr: *mut c_void,
    size: usize,
}

// SAFETY: the region is the sole owner of its allocation and only exposes the
// raw pointer and size; coordination of actual reads/writes is the stream's
// job, not the region's.
unsafe impl Send for DeviceRegion {}
unsafe impl Sync for DeviceRegion {}

impl DeviceRegion {
    pub fn new(api: Arc<dyn DeviceApi>, size: usize) -> DeviceResult<Self> {
        if size == 0 {
            tracing::warn!("zero-size device region requested");
        }
        tracing::trace!(size, "allocating device region");
        let ptr = api.alloc_device(size)?;
        Ok(DeviceRegion { api, ptr, size })
    }

    /// Region size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }
}

impl Drop for DeviceRegion {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            self.api.free_device(self.ptr);
        }
    }
}

impl fmt::Debug for DeviceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegion")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish()
    }
}

/// Host-pinned allocation, freed with the host primitive on drop.
///
/// Pinned so that device-initiated transfers into it need no extra staging
/// copy; the host side reads it directly once the stream is synchronized.
pub struct PinnedRegion {
    api: Arc<dyn DeviceApi>,
    ptr: *mut c_void,
    size: usize,
}

// SAFETY: same ownership argument as DeviceRegion.
unsafe impl Send for PinnedRegion {}
unsafe impl Sync for PinnedRegion {}

impl PinnedRegion {
    pub fn new(api: Arc<dyn DeviceApi>, size: usize) -> DeviceResult<Self> {
        if size == 0 {
            tracing::warn!("zero-size pinned region requested");
        }
        tracing::trace!(size, "allocating pinned region");
        let ptr = api.alloc_pinned(size)?;
        Ok(PinnedRegion { api, ptr, size })
    }

    /// Region size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }
}

impl Drop for PinnedRegion {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            self.api.free_pinned(self.ptr);
        }
    }
}

impl fmt::Debug for PinnedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedRegion")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish()
    }
}
