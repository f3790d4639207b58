//! Diagnostic sink for construction-time policy fallbacks.

/// Receives non-fatal diagnostics from buffer construction.
///
/// Injectable so tests can assert on the events without capturing log
/// output.
pub trait Diagnostics: Send + Sync {
    /// A tensor's leading extent was unresolved and the batch-size hint was
    /// substituted. The fallback produces a usable size, but the context
    /// should normally have had its binding dimensions set before buffers
    /// were built.
    fn batch_fallback(&self, tensor: &str, batch_size: usize);
}

/// Default sink: routes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn batch_fallback(&self, tensor: &str, batch_size: usize) {
        tracing::warn!(
            tensor,
            batch_size,
            "leading extent unresolved, substituting batch-size hint; set binding dimensions on the context before constructing buffers"
        );
    }
}
