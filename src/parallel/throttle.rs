use std::time::{Duration, Instant};

/// Minimum spacing between two overflow warnings from one worker.
pub(crate) const OVERFLOW_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Per-worker limiter for the "output queue full" warning.
///
/// Only emitting a warning moves the window, so sustained overload still
/// produces one warning per interval.
#[derive(Debug)]
pub(crate) struct OverflowThrottle {
    interval: Duration,
    last_logged: Option<Instant>,
    suppressed: u64,
}

impl OverflowThrottle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_logged: None,
            suppressed: 0,
        }
    }

    /// Record one drop at `now`. Returns `Some(n)` when a warning should be
    /// logged, `n` being the drops swallowed since the previous warning.
    pub(crate) fn on_drop(&mut self, now: Instant) -> Option<u64> {
        match self.last_logged {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last_logged = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }
}
