//! Tuning constants and the reader's builder-style configuration.

use std::time::Duration;

/// Size of a fragment payload, shared with the sender. Part of the wire
/// contract; changing it without the sender changing in lockstep breaks
/// decoding.
pub const DEFAULT_FRAGMENT_SIZE: usize = 1024;

/// Default read timeout for the data loop's blocking fragment read.
pub const READ_TIMEOUT_MS: u64 = 500;

/// Default upper bound on ack latency.
pub const MAX_TIME_BETWEEN_ACK_MS: u64 = 5;

/// Width of the rolling efficiency window, in frames.
pub const EFFICIENCY_WINDOW: usize = 15;

/// Tuning knobs for a [`crate::reader::Reader`].
///
/// Mirrors the fragment size shared with the sender and the two timing
/// ceilings from the concurrency model: the data loop's read timeout and
/// the ack loop's notification timeout.
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    pub fragment_size: usize,
    pub read_timeout: Duration,
    pub max_time_between_ack: Duration,
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self {
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
            max_time_between_ack: Duration::from_millis(MAX_TIME_BETWEEN_ACK_MS),
        }
    }

    pub fn with_fragment_size(mut self, fragment_size: usize) -> Self {
        self.fragment_size = fragment_size;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_time_between_ack(mut self, timeout: Duration) -> Self {
        self.max_time_between_ack = timeout;
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuning_constants() {
        let cfg = ReaderConfig::default();
        assert_eq!(cfg.fragment_size, DEFAULT_FRAGMENT_SIZE);
        assert_eq!(cfg.read_timeout, Duration::from_millis(500));
        assert_eq!(cfg.max_time_between_ack, Duration::from_millis(5));
    }

    #[test]
    fn builder_overrides_apply() {
        let cfg = ReaderConfig::new()
            .with_fragment_size(4)
            .with_read_timeout(Duration::from_millis(10))
            .with_max_time_between_ack(Duration::from_millis(1));
        assert_eq!(cfg.fragment_size, 4);
        assert_eq!(cfg.read_timeout, Duration::from_millis(10));
        assert_eq!(cfg.max_time_between_ack, Duration::from_millis(1));
    }
}
