//! Line coalescing - bounds how often incoming lines reach the view.

use std::time::Duration;

use tokio::time::Instant;

use logdeck_core::LogLine;

/// Coalesces rapid line arrivals into timed batches
///
/// A busy stream can deliver hundreds of frames per second. Lines are held
/// here and released at most once per `interval`. The very first batch is
/// released immediately.
#[derive(Debug)]
pub struct LineBatcher {
    /// Decoded lines awaiting flush, in arrival order
    pending: Vec<LogLine>,
    /// Time of the last flush, `None` before the first one
    last_flush: Option<Instant>,
    interval: Duration,
}

impl LineBatcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            pending: Vec::new(),
            last_flush: None,
            interval,
        }
    }

    /// Queue a line; returns true if the batch is due
    pub fn add(&mut self, line: LogLine) -> bool {
        self.pending.push(line);
        self.should_flush()
    }

    /// True when lines are pending and the interval has elapsed since the last flush
    pub fn should_flush(&self) -> bool {
        !self.pending.is_empty() && self.time_until_flush().is_zero()
    }

    /// Take every pending line and restart the interval
    pub fn flush(&mut self) -> Vec<LogLine> {
        self.last_flush = Some(Instant::now());
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time until the next flush is allowed (for event loop timing)
    pub fn time_until_flush(&self) -> Duration {
        match self.last_flush {
            Some(at) => self.interval.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }
}
