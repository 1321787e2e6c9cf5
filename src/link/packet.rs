//! Packet taxonomy on top of the wire framing.
//!
//! Each validated frame carries exactly one packet body:
//!
//! ```text
//! ┌─────────┬──────────────┬─────────────────┐
//! │ type:u8 │ opcode:u16 LE│ payload (len-3) │
//! └─────────┴──────────────┴─────────────────┘
//! ```
//!
//! The type byte is a closed set; anything else means the peer speaks a
//! different protocol revision and is treated as fatal, not ignored.

/// Packet header size in front of the payload (type + opcode).
pub const PACKET_HEADER_LEN: usize = 3;

/// Opcode carried by the INIT/INITRSP handshake packets.
pub const HANDSHAKE_OPCODE: u16 = 0x1337;

/// Opcode on LOG packets. Reserved; could carry the level later.
pub const LOG_OPCODE: u16 = 0;

/// Wire packet kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Handshake request; either peer may initiate.
    Init = 0,
    /// Handshake acknowledgement; opens the channel.
    InitRsp = 1,
    /// Host-issued command; always answered with a Rsp.
    Cmd = 2,
    /// Status reply to a Cmd.
    Rsp = 3,
    /// Fire-and-forget notification.
    Evt = 4,
    /// Receipt acknowledgement, reserved for future flow control.
    Ack = 5,
    /// Fatal error report, reserved.
    Err = 6,
    /// Diagnostic log line.
    Log = 7,
}

impl PacketType {
    /// Decode a wire type byte. `None` for anything outside the closed set.
    pub fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Init),
            1 => Some(Self::InitRsp),
            2 => Some(Self::Cmd),
            3 => Some(Self::Rsp),
            4 => Some(Self::Evt),
            5 => Some(Self::Ack),
            6 => Some(Self::Err),
            7 => Some(Self::Log),
            _ => None,
        }
    }

    pub const fn wire_value(self) -> u8 {
        self as u8
    }
}
