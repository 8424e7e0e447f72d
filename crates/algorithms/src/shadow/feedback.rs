//! Progress reporting and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};

/// Host callbacks for a long-running shading run.
///
/// All methods have no-op defaults.
pub trait Feedback {
    /// Percentage of the raster processed so far, `0.0..=100.0`
    fn set_progress(&self, _percent: f64) {}

    /// Polled once per chunk; returning `true` stops the run early
    fn is_canceled(&self) -> bool {
        false
    }

    /// A problem found before processing; `fatal` issues abort the run
    fn report_error(&self, _message: &str, _fatal: bool) {}
}

/// Feedback that ignores everything and never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {}

/// Cancellation flag that can be raised from another thread.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at the next chunk boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl Feedback for CancelFlag {
    fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl<F: Feedback + ?Sized> Feedback for &F {
    fn set_progress(&self, percent: f64) {
        (**self).set_progress(percent)
    }

    fn is_canceled(&self) -> bool {
        (**self).is_canceled()
    }

    fn report_error(&self, message: &str, fatal: bool) {
        (**self).report_error(message, fatal)
    }
}

/// How a streaming run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every chunk was written and the output flushed
    Finished { chunks: usize },
    /// Cancelled after `chunks` chunks; the output was not flushed
    Cancelled { chunks: usize },
}

impl Completion {
    /// Whether the run was cut short
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Completion::Cancelled { .. })
    }

    /// Chunks fully processed
    pub fn chunks(&self) -> usize {
        match *self {
            Completion::Finished { chunks } | Completion::Cancelled { chunks } => chunks,
        }
    }
}
