//! Receiver-side reassembly and acknowledgement engine for a fragmented,
//! low-latency streaming protocol over a lossy link.
//!
//! A [`reader::Reader`] is constructed with a network manager, a pair of
//! buffer ids, tuning [`config::ReaderConfig`], an initial frame buffer,
//! and a [`callback::FrameHandler`]. [`reader::Reader::spawn`] starts two
//! threads: a data loop that reassembles fragments into frames and a
//! short-period ack loop that reports the current per-frame bitmap back
//! to the sender.

pub mod bitmap;
pub mod callback;
pub mod config;
pub mod efficiency;
pub mod error;
pub mod header;
pub mod network;
pub mod reader;

pub use bitmap::AckBitmap;
pub use callback::FrameHandler;
pub use config::ReaderConfig;
pub use error::{NetworkError, ReaderError, Result};
pub use header::{AckPacket, FragmentHeader, FLUSH_FRAME};
pub use network::{NetworkManager, ReadStatus};
pub use reader::{Reader, ReaderHandle};
