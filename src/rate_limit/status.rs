use chrono::{DateTime, Utc};
use std::time::Duration;

/// Request count of one key within its current fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Requests observed since `window_start`
    pub count: u64,
    /// When the current window began
    pub window_start: DateTime<Utc>,
}

impl Status {
    /// Create a fresh status: no requests, window starting now
    pub fn new() -> Self {
        Self {
            count: 0,
            window_start: Utc::now(),
        }
    }

    /// The Nth request of a window is the one that reaches a limit of N
    pub fn reached_limit(&self, limit: u64) -> bool {
        self.count >= limit
    }

    /// Count one more request; saturates instead of overflowing
    pub fn record_request(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Whether the window that started at `window_start` has elapsed.
    ///
    /// Compares wall-clock time, since `window_start` is shared with other
    /// processes through the remote store. If the system clock steps back,
    /// windows last longer by the size of the step; a window starting in the
    /// future is never expired.
    pub fn is_expired(&self, window: Duration) -> bool {
        match chrono::Duration::from_std(window) {
            Ok(window) => match self.window_start.checked_add_signed(window) {
                Some(end) => Utc::now() > end,
                None => false,
            },
            // Windows too large for chrono never end
            Err(_) => false,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
