//! Shared test doubles for the staging layer.
//!
//! - [`TrackedAllocator`]: a `DeviceApi` over ordinary host memory that
//!   accounts every acquire/release per heap, aborts the test on a
//!   wrong-heap release or double-free, and can inject allocation failures.
//!   Copies execute immediately; a single test thread enqueuing on one
//!   stream trivially preserves FIFO order.
//! - [`FakeEngine`]: an `ExecutionContext` over a declared tensor list that
//!   records every bound address, plus an identity "inference" that copies
//!   an input binding to an output binding device-to-device.
//! - [`RecordingDiagnostics`]: captures fallback events for assertion.

#![allow(dead_code)]

use std::alloc::{alloc, dealloc, Layout};
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Mutex;

use rocstage::{
    CopyKind, DataTypeTag, DeviceApi, DeviceError, DeviceResult, Diagnostics, Dims,
    ExecutionContext, StreamHandle, TensorIoMode,
};

// Backing allocations are over-aligned so typed views of any supported
// element type land on valid addresses, as pinned allocations do for real.
const BACKING_ALIGN: usize = 64;

#[derive(Default)]
struct HeapState {
    // ptr -> (layout, requested size)
    live: HashMap<usize, (Layout, usize)>,
    allocs: usize,
    frees: usize,
}

impl HeapState {
    fn alloc(&mut self, size: usize) -> *mut c_void {
        let layout = Layout::from_size_align(size.max(1), BACKING_ALIGN).unwrap();
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc(layout) };
        assert!(!ptr.is_null(), "test backing allocation failed");
        self.live.insert(ptr as usize, (layout, size));
        self.allocs += 1;
        ptr as *mut c_void
    }

    fn free(&mut self, ptr: *mut c_void, heap: &str) {
        let (layout, _) = self
            .live
            .remove(&(ptr as usize))
            .unwrap_or_else(|| panic!("{} free of unknown pointer {:?} (wrong heap or double-free)", heap, ptr));
        // SAFETY: ptr came from alloc with this layout and was live until now.
        unsafe { dealloc(ptr as *mut u8, layout) };
        self.frees += 1;
    }
}

/// Per-heap allocation counters, captured via [`TrackedAllocator::counts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocCounts {
    pub device_allocs: usize,
    pub device_frees: usize,
    pub pinned_allocs: usize,
    pub pinned_frees: usize,
}

pub struct TrackedAllocator {
    device: Mutex<HeapState>,
    pinned: Mutex<HeapState>,
    fail_after: Mutex<Option<usize>>,
}

impl TrackedAllocator {
    pub fn new() -> Self {
        TrackedAllocator {
            device: Mutex::new(HeapState::default()),
            pinned: Mutex::new(HeapState::default()),
            fail_after: Mutex::new(None),
        }
    }

    /// Make the `n`-th subsequent allocation (across both heaps, 1-based)
    /// fail.
    pub fn fail_allocation(&self, n: usize) {
        *self.fail_after.lock().unwrap() = Some(n);
    }

    fn tick_failure(&self) -> DeviceResult<()> {
        let mut slot = self.fail_after.lock().unwrap();
        if let Some(remaining) = slot.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                *slot = None;
                return Err(DeviceError::AllocationFailed("injected failure".to_string()));
            }
        }
        Ok(())
    }

    pub fn counts(&self) -> AllocCounts {
        let device = self.device.lock().unwrap();
        let pinned = self.pinned.lock().unwrap();
        AllocCounts {
            device_allocs: device.allocs,
            device_frees: device.frees,
            pinned_allocs: pinned.allocs,
            pinned_frees: pinned.frees,
        }
    }

    pub fn is_live_device(&self, ptr: *mut c_void) -> bool {
        self.device.lock().unwrap().live.contains_key(&(ptr as usize))
    }

    pub fn is_live_pinned(&self, ptr: *mut c_void) -> bool {
        self.pinned.lock().unwrap().live.contains_key(&(ptr as usize))
    }

    /// Live allocations across both heaps.
    pub fn outstanding(&self) -> usize {
        self.device.lock().unwrap().live.len() + self.pinned.lock().unwrap().live.len()
    }

    /// Requested sizes of live device allocations, unordered.
    pub fn live_device_sizes(&self) -> Vec<usize> {
        self.device
            .lock()
            .unwrap()
            .live
            .values()
            .map(|&(_, size)| size)
            .collect()
    }

    /// Requested sizes of live pinned allocations, unordered.
    pub fn live_pinned_sizes(&self) -> Vec<usize> {
        self.pinned
            .lock()
            .unwrap()
            .live
            .values()
            .map(|&(_, size)| size)
            .collect()
    }

    pub fn assert_balanced(&self) {
        let counts = self.counts();
        assert_eq!(
            counts.device_allocs, counts.device_frees,
            "device heap out of balance: {:?}",
            counts
        );
        assert_eq!(
            counts.pinned_allocs, counts.pinned_frees,
            "pinned heap out of balance: {:?}",
            counts
        );
        assert_eq!(self.outstanding(), 0, "live allocations remain");
    }
}

impl DeviceApi for TrackedAllocator {
    fn alloc_device(&self, size: usize) -> DeviceResult<*mut c_void> {
        self.tick_failure()?;
        Ok(self.device.lock().unwrap().alloc(size))
    }

    fn free_device(&self, ptr: *mut c_void) {
        self.device.lock().unwrap().free(ptr, "device");
    }

    fn alloc_pinned(&self, size: usize) -> DeviceResult<*mut c_void> {
        self.tick_failure()?;
        Ok(self.pinned.lock().unwrap().alloc(size))
    }

    fn free_pinned(&self, ptr: *mut c_void) {
        self.pinned.lock().unwrap().free(ptr, "pinned");
    }

    unsafe fn memcpy_async(
        &self,
        dst: *mut c_void,
        src: *const c_void,
        len: usize,
        _kind: CopyKind,
        _stream: StreamHandle,
    ) -> DeviceResult<()> {
        if len > 0 {
            std::ptr::copy_nonoverlapping(src as *const u8, dst as *mut u8, len);
        }
        Ok(())
    }

    fn synchronize(&self, _stream: StreamHandle) -> DeviceResult<()> {
        Ok(())
    }
}

/// One declared tensor of the fake engine.
pub struct FakeTensor {
    pub name: String,
    pub mode: TensorIoMode,
    pub tag: DataTypeTag,
    pub extents: Vec<i64>,
}

/// Stub execution context over a declared tensor list.
#[derive(Default)]
pub struct FakeEngine {
    tensors: Vec<FakeTensor>,
    pub bound: HashMap<String, *mut c_void>,
}

impl FakeEngine {
    pub fn new() -> Self {
        FakeEngine::default()
    }

    pub fn input(mut self, name: &str, dtype: rocstage::DataType, extents: &[i64]) -> Self {
        self.tensors.push(FakeTensor {
            name: name.to_string(),
            mode: TensorIoMode::Input,
            tag: dtype.tag(),
            extents: extents.to_vec(),
        });
        self
    }

    pub fn output(mut self, name: &str, dtype: rocstage::DataType, extents: &[i64]) -> Self {
        self.tensors.push(FakeTensor {
            name: name.to_string(),
            mode: TensorIoMode::Output,
            tag: dtype.tag(),
            extents: extents.to_vec(),
        });
        self
    }

    /// Declare a tensor with a raw tag, for exercising the unsupported-type
    /// path.
    pub fn raw_tensor(
        mut self,
        name: &str,
        mode: TensorIoMode,
        tag: i32,
        extents: &[i64],
    ) -> Self {
        self.tensors.push(FakeTensor {
            name: name.to_string(),
            mode,
            tag: DataTypeTag(tag),
            extents: extents.to_vec(),
        });
        self
    }

    fn tensor(&self, name: &str) -> &FakeTensor {
        self.tensors
            .iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("unknown tensor '{}'", name))
    }

    /// Identity inference: copy `len` bytes from an input binding to an
    /// output binding, device-to-device on `stream`.
    pub fn run_identity(
        &self,
        api: &dyn DeviceApi,
        input: &str,
        output: &str,
        len: usize,
        stream: StreamHandle,
    ) -> DeviceResult<()> {
        let src = self.bound[input];
        let dst = self.bound[output];
        // SAFETY: both bindings are live device regions of at least len bytes.
        unsafe { api.memcpy_async(dst, src, len, CopyKind::DeviceToDevice, stream) }
    }
}

impl ExecutionContext for FakeEngine {
    fn io_tensor_count(&self) -> usize {
        self.tensors.len()
    }

    fn io_tensor_name(&self, index: usize) -> &str {
        &self.tensors[index].name
    }

    fn tensor_io_mode(&self, name: &str) -> TensorIoMode {
        self.tensor(name).mode
    }

    fn tensor_data_type(&self, name: &str) -> DataTypeTag {
        self.tensor(name).tag
    }

    fn tensor_shape(&self, name: &str) -> Dims {
        Dims::new(self.tensor(name).extents.clone())
    }

    fn set_tensor_address(&mut self, name: &str, address: *mut c_void) {
        let previous = self.bound.insert(name.to_string(), address);
        assert!(previous.is_none(), "address for '{}' bound twice", name);
    }
}

/// Diagnostics sink that records every fallback event.
#[derive(Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<(String, usize)>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        RecordingDiagnostics::default()
    }

    pub fn events(&self) -> Vec<(String, usize)> {
        self.events.lock().unwrap().clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn batch_fallback(&self, tensor: &str, batch_size: usize) {
        self.events
            .lock()
            .unwrap()
            .push((tensor.to_string(), batch_size));
    }
}
