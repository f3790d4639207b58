//! Allocation and transfer primitives behind the staging layer.
//!
//! The staging logic only ever needs five things from the accelerator
//! runtime: the device acquire/release pair, the host-pinned acquire/release
//! pair, and a stream-ordered copy. Factoring them into a trait keeps the
//! real HIP runtime and the allocation-tracking test doubles interchangeable.

use std::ffi::c_void;
use std::ptr;

use super::error::DeviceResult;

/// Transfer direction for [`DeviceApi::memcpy_async`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyKind {
    HostToDevice,
    DeviceToHost,
    DeviceToDevice,
}

/// Opaque handle to an execution stream.
///
/// Operations enqueued on one handle execute in enqueue order; the handle
/// itself is just a token and carries no ownership. [`StreamHandle::null`]
/// selects the runtime's default stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHandle(*mut c_void);

// SAFETY: the handle is an opaque queue token; the runtime that issued it
// serializes all work enqueued through it.
unsafe impl Send for StreamHandle {}
unsafe impl Sync for StreamHandle {}

impl StreamHandle {
    pub const fn null() -> Self {
        StreamHandle(ptr::null_mut())
    }

    pub fn from_raw(raw: *mut c_void) -> Self {
        StreamHandle(raw)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

/// Accelerator memory and transfer primitives.
///
/// Allocation and release come in two distinct pairs, device-resident and
/// host-pinned, and a pointer must always be released with the pair that
/// produced it. Implementations return a non-null pointer for non-zero sizes
/// or an error; a zero-size allocation may return null, and the release
/// methods must tolerate it.
pub trait DeviceApi: Send + Sync {
    fn alloc_device(&self, size: usize) -> DeviceResult<*mut c_void>;

    fn free_device(&self, ptr: *mut c_void);

    fn alloc_pinned(&self, size: usize) -> DeviceResult<*mut c_void>;

    fn free_pinned(&self, ptr: *mut c_void);

    /// Enqueue an asynchronous copy of `len` bytes on `stream`.
    ///
    /// Returns once the copy is enqueued, not once it completes; completion
    /// is ordered relative to other work on the same stream.
    ///
    /// # Safety
    ///
    /// `dst` and `src` must stay valid for `len` bytes, on the memory spaces
    /// `kind` names, until the stream has executed the copy.
    unsafe fn memcpy_async(
        &self,
        dst: *mut c_void,
        src: *const c_void,
        len: usize,
        kind: CopyKind,
        stream: StreamHandle,
    ) -> DeviceResult<()>;

    /// Block the calling thread until all work enqueued on `stream` has
    /// completed.
    fn synchronize(&self, stream: StreamHandle) -> DeviceResult<()>;
}
