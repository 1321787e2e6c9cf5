//! Link configuration parameters
//!
//! All tunable parameters for one framed channel. Host tooling ships
//! overrides as JSON blobs; the defaults match the production UART targets.

use serde::{Deserialize, Serialize};

use crate::link::checksum::ChecksumKind;

/// Per-channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    // --- Receive path ---
    /// Capacity of the raw receive ring in bytes (rounded up to a power of
    /// two). Sized so the ring can absorb a burst while a dispatch runs.
    pub rx_ring_capacity: usize,
    /// Largest accepted packet body (type + opcode + payload). Frames
    /// advertising more than this are discarded as corrupt.
    pub max_packet_size: usize,

    // --- Transmit path ---
    /// Number of outbound packet buffers in the pool.
    pub pool_buffers: usize,
    /// Size of each outbound buffer, headroom included.
    pub pool_buffer_size: usize,

    // --- Integrity ---
    /// Frame checksum algorithm. `Disabled` interoperates with legacy hosts
    /// that emit a constant zero.
    pub checksum: ChecksumKind,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // Receive path
            rx_ring_capacity: 2048,
            max_packet_size: 2048,

            // Transmit path
            pool_buffers: 8,
            pool_buffer_size: 2048,

            // Integrity
            checksum: ChecksumKind::Crc8Ccitt,
        }
    }
}

impl LinkConfig {
    /// Parse a configuration blob produced by the host provisioning tools.
    pub fn from_json(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }
}
