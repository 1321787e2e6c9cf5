//! Opcode numbering shared with the host tooling.
//!
//! The host and target builds must agree on these values; an opcode
//! arriving without a registered handler takes the channel down, by
//! design. Commands flow host → target, events flow target → host (the
//! host may also subscribe to them in its test harnesses).

// ── Commands (host → target) ──────────────────────────────────

/// Start connectable advertising.
pub const CMD_BT_ADVERTISE: u16 = 0x01;
/// Start scanning; payload carries the RSSI threshold.
pub const CMD_BT_SCAN: u16 = 0x02;
/// Stop an active scan.
pub const CMD_BT_SCAN_STOP: u16 = 0x03;
/// Connect to a peer; payload carries address and connection parameters.
pub const CMD_BT_CONNECT: u16 = 0x04;
/// Tear down the active connection.
pub const CMD_BT_DISCONNECT: u16 = 0x05;
/// Crash the target on purpose (fault-handling tests).
pub const CMD_TRIGGER_PANIC: u16 = 0x06;

// ── Events (target → host) ────────────────────────────────────

/// Boot complete, channel usable.
pub const EVT_READY: u16 = 0x01;
/// Connection established; payload carries peer address and status.
pub const EVT_BT_CONNECTED: u16 = 0x02;
/// Connection lost.
pub const EVT_BT_DISCONNECTED: u16 = 0x03;
/// Scan hit above the threshold; payload carries address, RSSI and AD data.
pub const EVT_BT_SCAN_REPORT: u16 = 0x04;
