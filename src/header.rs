//! Wire layout for the inbound fragment header and the outbound ack packet.
//!
//! The two use different byte orders on the wire: the fragment header is
//! big-endian (matching the sender this reader was built against), the ack
//! packet is little-endian. This asymmetry comes from the protocol this
//! was built for and is preserved deliberately.

use crate::error::{ReaderError, Result};

/// Set on `frame_flags` to mark a keyframe / resync boundary.
pub const FLUSH_FRAME: u8 = 0x01;

/// Fixed on-wire size of [`FragmentHeader`].
pub const FRAGMENT_HEADER_SIZE: usize = 5;

/// Fixed on-wire size of [`AckPacket`].
pub const ACK_PACKET_SIZE: usize = 18;

/// Header preceding every fragment's payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    pub frame_number: u16,
    pub fragment_number: u8,
    pub fragments_per_frame: u8,
    pub frame_flags: u8,
}

impl FragmentHeader {
    pub fn is_flush(&self) -> bool {
        self.frame_flags & FLUSH_FRAME != 0
    }

    /// Decodes a header from the front of `buf`. `buf` must be at least
    /// [`FRAGMENT_HEADER_SIZE`] bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < FRAGMENT_HEADER_SIZE {
            return Err(ReaderError::BadParameters);
        }
        let frame_number = u16::from_be_bytes([buf[0], buf[1]]);
        Ok(Self {
            frame_number,
            fragment_number: buf[2],
            fragments_per_frame: buf[3],
            frame_flags: buf[4],
        })
    }

    /// Encodes the header into the front of `buf`. Returns the number of
    /// bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < FRAGMENT_HEADER_SIZE {
            return Err(ReaderError::BadParameters);
        }
        let fn_bytes = self.frame_number.to_be_bytes();
        buf[0] = fn_bytes[0];
        buf[1] = fn_bytes[1];
        buf[2] = self.fragment_number;
        buf[3] = self.fragments_per_frame;
        buf[4] = self.frame_flags;
        Ok(FRAGMENT_HEADER_SIZE)
    }
}

/// The ack packet submitted to the network manager once per ack-loop
/// iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPacket {
    pub frame_number: u16,
    pub high_packets_ack: u64,
    pub low_packets_ack: u64,
}

impl AckPacket {
    /// Encodes the packet into `buf`, little-endian throughout. Returns
    /// the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < ACK_PACKET_SIZE {
            return Err(ReaderError::BadParameters);
        }
        buf[0..2].copy_from_slice(&self.frame_number.to_le_bytes());
        buf[2..10].copy_from_slice(&self.high_packets_ack.to_le_bytes());
        buf[10..18].copy_from_slice(&self.low_packets_ack.to_le_bytes());
        Ok(ACK_PACKET_SIZE)
    }

    /// Decodes a packet from `buf`. Used by tests to assert round-trip
    /// byte-identity; the reader itself never needs to decode its own acks.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < ACK_PACKET_SIZE {
            return Err(ReaderError::BadParameters);
        }
        Ok(Self {
            frame_number: u16::from_le_bytes([buf[0], buf[1]]),
            high_packets_ack: u64::from_le_bytes(buf[2..10].try_into().unwrap()),
            low_packets_ack: u64::from_le_bytes(buf[10..18].try_into().unwrap()),
        })
    }
}
