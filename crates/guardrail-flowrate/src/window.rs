use std::time::Duration;
use tokio::time::Instant;

/// Where the per-window admission limit sits relative to
/// `max_requests_per_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowLimit {
    /// Admit while the window count is at most the maximum, so a window
    /// admits `max_requests_per_interval + 1` calls.
    #[default]
    Lenient,
    /// Admit exactly `max_requests_per_interval` calls per window.
    Strict,
}

/// A fixed-window counter.
///
/// Windows are aligned to the creation instant: window `k` covers
/// `[epoch + k * interval, epoch + (k + 1) * interval)`. The counter is
/// brought up to date lazily, whenever it is read or incremented.
#[derive(Debug)]
pub(crate) struct FixedWindow {
    max: usize,
    interval: Duration,
    limit: WindowLimit,
    epoch: Instant,
    index: u128,
    count: usize,
}

impl FixedWindow {
    pub(crate) fn new(max: usize, interval: Duration, limit: WindowLimit, now: Instant) -> Self {
        Self {
            max,
            interval,
            limit,
            epoch: now,
            index: 0,
            count: 0,
        }
    }

    /// Moves to the window containing `now`.
    ///
    /// Returns the count of the window that ended, if a boundary was crossed.
    pub(crate) fn roll(&mut self, now: Instant) -> Option<usize> {
        let elapsed = now.saturating_duration_since(self.epoch);
        let index = elapsed.as_nanos() / self.interval.as_nanos().max(1);
        if index <= self.index {
            return None;
        }
        self.index = index;
        Some(std::mem::take(&mut self.count))
    }

    pub(crate) fn has_room(&self) -> bool {
        match self.limit {
            WindowLimit::Lenient => self.count <= self.max,
            WindowLimit::Strict => self.count < self.max,
        }
    }

    /// Counts one admission if the window has room. Returns the new count.
    pub(crate) fn try_admit(&mut self) -> Option<usize> {
        if !self.has_room() {
            return None;
        }
        self.count += 1;
        Some(self.count)
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Start of the next window.
    pub(crate) fn next_boundary(&self) -> Instant {
        let nanos = self.interval.as_nanos().saturating_mul(self.index + 1);
        let offset = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));
        self.epoch + offset
    }
}
