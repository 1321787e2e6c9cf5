//! Unified error types for the uartlink transport.
//!
//! A single `Error` enum that every part of the link can convert into,
//! keeping the caller's error handling uniform. All variants are `Copy` so
//! they can be passed between the ingest and dispatch contexts without
//! allocation.
//!
//! Two classes matter to callers:
//! - `NotConnected` is transient: retry once the handshake completes.
//! - `Protocol(_)` is fatal: it indicates a build/version mismatch between
//!   the two peers, the channel shuts down and stays down.

use core::fmt;

use crate::link::packet::PacketType;

// ---------------------------------------------------------------------------
// Top-level link error
// ---------------------------------------------------------------------------

/// Every fallible operation on the link funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The handshake has not completed; payload packets are rejected.
    NotConnected,
    /// The channel was shut down by an earlier protocol violation.
    ChannelDown,
    /// The outbound buffer pool is exhausted.
    NoBuffers,
    /// The packet does not fit the configured buffer geometry.
    PacketTooLarge,
    /// The underlying byte transport refused the frame.
    TransportWrite,
    /// Unrecoverable protocol violation (peer build mismatch).
    Protocol(ProtocolViolation),
    /// Setup or registration misuse.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "channel not initialized"),
            Self::ChannelDown => write!(f, "channel down after protocol violation"),
            Self::NoBuffers => write!(f, "no free packet buffers"),
            Self::PacketTooLarge => write!(f, "packet exceeds buffer size"),
            Self::TransportWrite => write!(f, "transport write failed"),
            Self::Protocol(v) => write!(f, "protocol violation: {v}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Protocol violations
// ---------------------------------------------------------------------------

/// Fatal wire-level conditions.
///
/// These terminate the channel rather than being retried: a peer that sends
/// an unknown packet type or an unregistered opcode is running a different
/// protocol revision, and nothing received afterwards can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// Packet type byte outside the closed enum.
    UnknownPacketType(u8),
    /// Command opcode with no registered handler.
    UnhandledCommand(u16),
    /// Event opcode with no registered handler.
    UnhandledEvent(u16),
    /// Packet kind this role never receives (e.g. an inbound RSP).
    UnexpectedDirection(PacketType),
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPacketType(raw) => write!(f, "unknown packet type {raw:#04x}"),
            Self::UnhandledCommand(op) => write!(f, "no command handler for opcode {op:#06x}"),
            Self::UnhandledEvent(op) => write!(f, "no event handler for opcode {op:#06x}"),
            Self::UnexpectedDirection(t) => write!(f, "unexpected inbound {t:?} packet"),
        }
    }
}

impl From<ProtocolViolation> for Error {
    fn from(v: ProtocolViolation) -> Self {
        Self::Protocol(v)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Link-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
