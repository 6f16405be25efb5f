//! Progress reporting for the sync run.
//!
//! The pipeline reports through [`ProgressCallback`] so the CLI can render
//! `indicatif` bars while tests and non-interactive callers stay silent.

/// Receives progress from a long-running operation.
pub trait ProgressCallback: Send + Sync {
    /// Set the number of stages the run will pass through.
    fn set_total(&self, total: u64);

    /// Advance by `delta` stages.
    fn inc(&self, delta: u64);

    /// Show the name of the current stage.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}
