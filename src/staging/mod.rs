//! Buffer lifetime and transfer orchestration around an inference call.
//!
//! [`BufferManager`] walks an execution context's I/O tensor list once,
//! allocates every region the session needs, registers the bound addresses
//! with the context, and then only ever copies into and out of those regions,
//! never resizing or reallocating them. Teardown releases everything exactly
//! once.

mod diagnostics;

pub use diagnostics::{Diagnostics, TracingDiagnostics};

use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::backend::{CopyKind, DeviceApi, DeviceRegion, PinnedRegion, StreamHandle};
use crate::engine::{ExecutionContext, TensorIoMode};
use crate::error::{StageError, StageResult};
use crate::tensor::{DataType, Element};

/// Construction options for [`BufferManager`].
pub struct BindingOptions {
    /// Substituted for an unresolved leading extent. Only consulted when the
    /// context reports a dynamic shape.
    pub batch_size: usize,
    /// Sink for the dynamic-dimension fallback diagnostic.
    pub diagnostics: Arc<dyn Diagnostics>,
}

impl Default for BindingOptions {
    fn default() -> Self {
        BindingOptions {
            batch_size: 1,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }
}

impl BindingOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl fmt::Debug for BindingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingOptions")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

/// Owns every memory region of one engine binding session and stages bytes
/// across them.
///
/// Per input tensor: one device region, registered as the tensor's bound
/// address. Per output tensor: one device region (registered, since the
/// engine computes into it) and one host-pinned region (the copy-out target
/// that [`to_host`](BufferManager::to_host) fills and the read views expose).
///
/// The expected call sequence per inference is
/// [`set_inputs`](BufferManager::set_inputs), then
/// [`to_device`](BufferManager::to_device), the engine invocation,
/// [`to_host`](BufferManager::to_host), stream synchronization, and finally
/// [`try_read_output`](BufferManager::try_read_output). The transfer calls
/// enqueue on the given stream and return immediately; the caller owns all
/// synchronization, both before reading outputs and before reusing any input
/// source buffer a transfer may still be reading.
///
/// The manager is driven by a single thread and holds raw caller pointers,
/// so it is deliberately neither `Send` nor `Sync`.
pub struct BufferManager {
    api: Arc<dyn DeviceApi>,
    input_regions: Vec<DeviceRegion>,
    input_sizes: Vec<usize>,
    input_sources: Vec<*const c_void>,
    output_device: Vec<DeviceRegion>,
    output_host: Vec<PinnedRegion>,
    output_sizes: Vec<usize>,
    output_types: Vec<DataType>,
    bindings: Vec<*mut c_void>,
}

impl BufferManager {
    /// Build buffers for every I/O tensor `context` declares, with batch
    /// size 1 and the default diagnostics sink.
    pub fn new(
        context: &mut dyn ExecutionContext,
        api: Arc<dyn DeviceApi>,
    ) -> StageResult<Self> {
        Self::with_options(context, api, BindingOptions::default())
    }

    /// Build buffers for every I/O tensor `context` declares.
    ///
    /// Walks the context's tensors in enumeration order; for each one,
    /// resolves element type and shape, allocates the region(s), and
    /// registers the bound address. Any failure aborts construction and
    /// releases whatever was already allocated.
    pub fn with_options(
        context: &mut dyn ExecutionContext,
        api: Arc<dyn DeviceApi>,
        options: BindingOptions,
    ) -> StageResult<Self> {
        let count = context.io_tensor_count();

        let mut manager = BufferManager {
            api,
            input_regions: Vec::new(),
            input_sizes: Vec::new(),
            input_sources: Vec::new(),
            output_device: Vec::new(),
            output_host: Vec::new(),
            output_sizes: Vec::new(),
            output_types: Vec::new(),
            bindings: Vec::with_capacity(count),
        };

        for index in 0..count {
            let name = context.io_tensor_name(index).to_string();
            let mode = context.tensor_io_mode(&name);

            let tag = context.tensor_data_type(&name);
            let dtype = DataType::from_tag(tag).ok_or_else(|| {
                StageError::UnsupportedDataType {
                    tensor: name.clone(),
                    tag: tag.0,
                }
            })?;

            let mut dims = context.tensor_shape(&name);
            if dims.leading_is_dynamic() {
                options.diagnostics.batch_fallback(&name, options.batch_size);
                dims.resolve_leading(options.batch_size);
            }
            if let Some(axis) = dims.as_slice().iter().position(|&extent| extent < 0) {
                return Err(StageError::InvalidDimension {
                    tensor: name,
                    axis,
                    extent: dims.as_slice()[axis],
                });
            }

            let size = dtype.size_of().saturating_mul(dims.volume());

            match mode {
                TensorIoMode::Input => {
                    let region = DeviceRegion::new(manager.api.clone(), size)?;
                    context.set_tensor_address(&name, region.as_ptr());
                    manager.bindings.push(region.as_ptr());
                    manager.input_sizes.push(size);
                    manager.input_regions.push(region);
                }
                TensorIoMode::Output => {
                    let device = DeviceRegion::new(manager.api.clone(), size)?;
                    let host = PinnedRegion::new(manager.api.clone(), size)?;
                    context.set_tensor_address(&name, device.as_ptr());
                    manager.bindings.push(device.as_ptr());
                    manager.output_sizes.push(size);
                    manager.output_types.push(dtype);
                    manager.output_device.push(device);
                    manager.output_host.push(host);
                }
            }
        }

        tracing::debug!(
            inputs = manager.input_regions.len(),
            outputs = manager.output_device.len(),
            input_bytes = manager.input_sizes.iter().sum::<usize>(),
            output_bytes = manager.output_sizes.iter().sum::<usize>(),
            "buffer manager constructed"
        );

        Ok(manager)
    }

    /// Record where the next [`to_device`](BufferManager::to_device) reads
    /// input bytes from: one host pointer per input tensor, in construction
    /// order. No copying happens here.
    ///
    /// Caller obligation: each pointer addresses at least the corresponding
    /// entry of [`input_sizes`](BufferManager::input_sizes) bytes of
    /// host-accessible memory, and stays valid until the transfer that reads
    /// it has been synchronized.
    pub fn set_inputs(&mut self, sources: &[*const c_void]) {
        debug_assert_eq!(
            sources.len(),
            self.input_regions.len(),
            "one source pointer per input tensor, in construction order"
        );
        self.input_sources = sources.to_vec();
    }

    /// Enqueue the host->device copy of every input tensor on `stream`.
    ///
    /// Returns once the copies are enqueued; completion is ordered relative
    /// to other work on the same stream. [`set_inputs`](BufferManager::set_inputs)
    /// must have supplied a pointer per input first; this is a caller
    /// obligation, not an internal check.
    pub fn to_device(&self, stream: StreamHandle) -> StageResult<()> {
        for (index, region) in self.input_regions.iter().enumerate() {
            // SAFETY: destination is an owned device region of input_sizes[index]
            // bytes; the source pointer and extent are the caller's contract
            // from set_inputs.
            unsafe {
                self.api.memcpy_async(
                    region.as_ptr(),
                    self.input_sources[index],
                    self.input_sizes[index],
                    CopyKind::HostToDevice,
                    stream,
                )?;
            }
        }
        Ok(())
    }

    /// Enqueue the device->host copy of every output tensor on `stream`,
    /// from the device region the engine computed into to the pinned region
    /// the read views expose.
    ///
    /// Same ordering contract as [`to_device`](BufferManager::to_device):
    /// synchronize the stream before reading.
    pub fn to_host(&self, stream: StreamHandle) -> StageResult<()> {
        for index in 0..self.output_sizes.len() {
            // SAFETY: both regions are owned, live, and output_sizes[index]
            // bytes long.
            unsafe {
                self.api.memcpy_async(
                    self.output_host[index].as_ptr(),
                    self.output_device[index].as_ptr(),
                    self.output_sizes[index],
                    CopyKind::DeviceToHost,
                    stream,
                )?;
            }
        }
        Ok(())
    }

    /// Reinterpret output `index` as `N` elements of `T`, unchecked.
    ///
    /// # Safety
    ///
    /// The caller must ensure that a [`to_host`](BufferManager::to_host) on a
    /// since-synchronized stream has populated the region, that `index` is in
    /// range, that `N * size_of::<T>()` does not exceed the region, and that
    /// `T` matches the tensor's element type. Nothing is validated here;
    /// [`try_read_output`](BufferManager::try_read_output) is the checked
    /// alternative.
    pub unsafe fn read_output<T, const N: usize>(&self, index: usize) -> &[T; N] {
        &*(self.output_host[index].as_ptr() as *const [T; N])
    }

    /// Checked variant of [`read_output`](BufferManager::read_output):
    /// validates the index, the element type the engine declared for the
    /// tensor, the byte extent, and alignment. The synchronization obligation
    /// is still the caller's.
    pub fn try_read_output<T: Element, const N: usize>(
        &self,
        index: usize,
    ) -> StageResult<&[T; N]> {
        let region = self
            .output_host
            .get(index)
            .ok_or(StageError::OutputIndexOutOfRange {
                index,
                count: self.output_host.len(),
            })?;

        let declared = self.output_types[index];
        if T::DATA_TYPE != declared {
            return Err(StageError::OutputViewTypeMismatch {
                index,
                declared,
                requested: T::DATA_TYPE,
            });
        }

        let need = N.saturating_mul(mem::size_of::<T>());
        if need > region.size() {
            return Err(StageError::OutputViewTooLarge {
                index,
                need,
                have: region.size(),
            });
        }

        if (region.as_ptr() as usize) % mem::align_of::<T>() != 0 {
            return Err(StageError::OutputViewMisaligned { index });
        }

        // SAFETY: index, element type, extent, and alignment checked above;
        // the region is owned and lives as long as &self.
        Ok(unsafe { &*(region.as_ptr() as *const [T; N]) })
    }

    /// The bound addresses in enumeration order, for invocation styles that
    /// take a flat binding-pointer array instead of named bindings.
    pub fn io(&self) -> &[*mut c_void] {
        &self.bindings
    }

    /// Byte size of each input region, in construction order.
    pub fn input_sizes(&self) -> &[usize] {
        &self.input_sizes
    }

    /// Byte size of each output region, in construction order.
    pub fn output_sizes(&self) -> &[usize] {
        &self.output_sizes
    }

    pub fn input_count(&self) -> usize {
        self.input_regions.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_device.len()
    }
}

impl fmt::Debug for BufferManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferManager")
            .field("inputs", &self.input_regions.len())
            .field("outputs", &self.output_device.len())
            .field("input_sizes", &self.input_sizes)
            .field("output_sizes", &self.output_sizes)
            .finish_non_exhaustive()
    }
}
