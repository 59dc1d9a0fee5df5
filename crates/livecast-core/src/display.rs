//! Viewer-count display sink.

/// Receives the room's current viewer count on every update.
///
/// Called from the connection's receive task, never from a UI thread.
/// Implementations that drive a UI must marshal the value themselves and
/// must not block.
pub trait ViewerDisplay: Send + Sync {
    /// Report the latest count. Repeated values are reported as-is.
    fn report_viewer_count(&self, count: i64);
}

/// A display that discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDisplay;

impl ViewerDisplay for NullDisplay {
    fn report_viewer_count(&self, _count: i64) {}
}

impl<F> ViewerDisplay for F
where
    F: Fn(i64) + Send + Sync,
{
    fn report_viewer_count(&self, count: i64) {
        self(count);
    }
}
