//! Frame checksum strategies.
//!
//! The checksum byte in the wire header covers the two length bytes and the
//! packet body; the constant marker is excluded. Legacy hosts emit a
//! constant zero and accept anything, so the algorithm is selected per
//! channel: `Crc8Ccitt` for current peers, `Disabled` for interop with the
//! old ones.

use serde::{Deserialize, Serialize};

/// Checksum algorithm carried in the link configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumKind {
    /// CRC-8/CCITT, polynomial 0x07, init 0x00.
    Crc8Ccitt,
    /// Emit zero, accept anything (legacy peers).
    Disabled,
}

impl ChecksumKind {
    /// Checksum for a frame with body length `len` and body bytes `body`.
    pub fn frame_checksum(self, len: u16, body: &[u8]) -> u8 {
        match self {
            Self::Crc8Ccitt => {
                let crc = crc8_ccitt(0, &len.to_le_bytes());
                crc8_ccitt(crc, body)
            }
            Self::Disabled => 0,
        }
    }

    /// Check a received frame against its header checksum byte.
    pub fn verify(self, len: u16, body: &[u8], received: u8) -> bool {
        match self {
            Self::Crc8Ccitt => self.frame_checksum(len, body) == received,
            Self::Disabled => true,
        }
    }
}

fn crc8_ccitt(mut crc: u8, data: &[u8]) -> u8 {
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        }
    }
    crc
}
