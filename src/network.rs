//! The network manager contract consumed by the reader.
//!
//! The reader never opens sockets itself; it is handed a collaborator that
//! already knows how to read and write framed, fixed-capacity buffers
//! identified by a buffer id. Implementations may be loopback (for tests),
//! a wrapped UDP socket, or anything else that satisfies the contract.

use std::time::Duration;

use crate::error::NetworkError;

/// Outcome of a timed read.
#[derive(Debug)]
pub enum ReadStatus {
    /// `usize` bytes were written into the caller's buffer.
    Data(usize),
    /// No data arrived before the timeout elapsed.
    Empty,
}

/// External collaborator providing framed, timeout-capable packet I/O.
///
/// `buffer_id` distinguishes the inbound fragment stream from the outbound
/// ack stream; a single implementation typically multiplexes both over one
/// underlying socket.
pub trait NetworkManager: Send + Sync {
    /// Blocks up to `timeout` waiting for a packet on `buffer_id`, copying
    /// it into `buf`. Returns `Empty` rather than an error on a plain
    /// timeout with nothing pending.
    fn read_with_timeout(
        &self,
        buffer_id: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<ReadStatus, NetworkError>;

    /// Submits `data` for transmission on `buffer_id`. Assumed
    /// non-blocking/enqueueing, matching the ack loop's suspension-point
    /// contract.
    fn send_data(&self, buffer_id: u16, data: &[u8]) -> Result<(), NetworkError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// An in-memory loopback network manager for tests: `push_fragment`
    /// queues bytes that a subsequent `read_with_timeout` call drains in
    /// FIFO order, and every `send_data` call is recorded for inspection.
    #[derive(Default)]
    pub struct LoopbackNetwork {
        inbound: Mutex<VecDeque<Vec<u8>>>,
        pub sent: Mutex<Vec<(u16, Vec<u8>)>>,
    }

    impl LoopbackNetwork {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_fragment(&self, bytes: Vec<u8>) {
            self.inbound.lock().unwrap().push_back(bytes);
        }
    }

    impl NetworkManager for LoopbackNetwork {
        fn read_with_timeout(
            &self,
            _buffer_id: u16,
            buf: &mut [u8],
            _timeout: Duration,
        ) -> Result<ReadStatus, NetworkError> {
            let mut inbound = self.inbound.lock().unwrap();
            match inbound.pop_front() {
                Some(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(ReadStatus::Data(n))
                }
                None => Ok(ReadStatus::Empty),
            }
        }

        fn send_data(&self, buffer_id: u16, data: &[u8]) -> Result<(), NetworkError> {
            self.sent.lock().unwrap().push((buffer_id, data.to_vec()));
            Ok(())
        }
    }
}
