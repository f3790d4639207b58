//! Engine-collaborator contract.
//!
//! The inference runtime that owns the compiled model is a black box to this
//! crate; buffer construction only needs to enumerate its I/O tensors and
//! register one bound address per tensor. Expressing that surface as a trait
//! keeps the staging logic testable against a stub engine.

use std::ffi::c_void;

use crate::tensor::{DataTypeTag, Dims};

/// Direction of one I/O tensor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorIoMode {
    Input,
    Output,
}

/// Handle to an active engine execution context.
///
/// Names returned by [`io_tensor_name`](ExecutionContext::io_tensor_name) are
/// unique and stable for the lifetime of the context, and the per-name query
/// methods accept exactly those names. Enumeration order is the binding order
/// the rest of the crate preserves.
///
/// [`set_tensor_address`](ExecutionContext::set_tensor_address) is called
/// exactly once per tensor, during buffer construction, and the registered
/// address is never reassigned for the life of the session.
pub trait ExecutionContext {
    fn io_tensor_count(&self) -> usize;

    fn io_tensor_name(&self, index: usize) -> &str;

    fn tensor_io_mode(&self, name: &str) -> TensorIoMode;

    /// Element type as the runtime's raw tag; unsupported tags fail buffer
    /// construction.
    fn tensor_data_type(&self, name: &str) -> DataTypeTag;

    /// Current shape, possibly with an unresolved leading extent.
    fn tensor_shape(&self, name: &str) -> Dims;

    /// Register the memory address the engine will read this tensor from
    /// (inputs) or write it to (outputs).
    fn set_tensor_address(&mut self, name: &str, address: *mut c_void);
}
