//! Deferred speech work.

/// One unit of speech rendering work: what to say and which voice says it.
///
/// Tasks are fire-and-forget. They are created by the message router and
/// consumed exactly once by the pipeline worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTask {
    /// Text to synthesise.
    pub text: String,
    /// Index into the configured voice table.
    pub voice_index: usize,
}

impl RenderTask {
    /// Build a task.
    pub fn new(text: impl Into<String>, voice_index: usize) -> Self {
        Self {
            text: text.into(),
            voice_index,
        }
    }
}
