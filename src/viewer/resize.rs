//! Resize coalescing

use std::time::{Duration, Instant};

use crate::layout::Viewport;

/// Keeps only the last viewport of a burst and releases it once no further
/// resize has arrived for `quiet` time
#[derive(Debug)]
pub struct ResizeDebouncer {
    quiet: Duration,
    pending: Option<(Viewport, Instant)>,
}

impl ResizeDebouncer {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn push(&mut self, viewport: Viewport, now: Instant) {
        self.pending = Some((viewport, now));
    }

    /// The settled viewport, once the quiet window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<Viewport> {
        let (viewport, at) = self.pending?;
        if now.saturating_duration_since(at) >= self.quiet {
            self.pending = None;
            Some(viewport)
        } else {
            None
        }
    }

    /// Release the pending viewport regardless of the quiet window
    pub fn flush(&mut self) -> Option<Viewport> {
        self.pending.take().map(|(viewport, _)| viewport)
    }
}
