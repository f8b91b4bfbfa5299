//! Error types surfaced by the reader engine.

use std::fmt;

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Error kinds surfaced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderError {
    /// Invalid construction arguments (missing network manager, missing
    /// callback, missing initial buffer, or zero capacity).
    BadParameters,

    /// Memory or lock/condition initialization failure. Unreachable in
    /// practice since `Mutex::new`/`Condvar::new` cannot fail, kept for
    /// parity with the reader's lifecycle contract.
    Alloc,

    /// `try_delete` was called before both loops finished.
    Busy,
}

impl ReaderError {
    /// Returns a human-readable description of the error.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReaderError::BadParameters => "bad parameters",
            ReaderError::Alloc => "allocation failure",
            ReaderError::Busy => "reader busy",
        }
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ReaderError {}

/// Errors reported by the network manager collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// The underlying transport reported a failure other than "buffer
    /// empty" (e.g. a closed socket, a malformed frame at a lower layer).
    Other,
}

impl NetworkError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NetworkError::Other => "network manager error",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for NetworkError {}
