//! uartlink — framed RPC transport for embedded test targets.
//!
//! A small request/response/event protocol over an unreliable byte-oriented
//! serial link between an asymmetric pair: a resource-constrained target
//! (this crate's role) and a host controller. The link synchronizes a
//! framing header on the raw byte stream, hands completed packets from the
//! IRQ-fed ingest path to a single deferred dispatcher, performs a one-time
//! INIT/INITRSP handshake, and routes typed packets to handlers registered
//! by opcode.
//!
//! ```text
//! host ──frames──▶ ingest ──ring──▶ dispatch ──▶ handlers
//!      ◀─RSP/EVT/LOG── send lock ◀──────────────────┘
//! ```
//!
//! Typical target bring-up:
//!
//! ```no_run
//! # use critical_section as _;
//! use std::sync::Arc;
//! use uartlink::link::registry::CommandTable;
//! use uartlink::link::transport::NullTransport;
//! use uartlink::link::worker;
//! use uartlink::{LinkChannel, LinkConfig};
//!
//! # fn main() -> uartlink::Result<()> {
//! let mut channel = LinkChannel::new(LinkConfig::default(), NullTransport);
//! channel.register_command_handlers(
//!     CommandTable::new().with(uartlink::opcodes::CMD_BT_SCAN, |_payload| 0)?,
//! );
//! let channel = Arc::new(channel);
//! let _dispatch = worker::spawn_dispatcher(Arc::clone(&channel));
//! // Arm the UART, route its RX bytes into channel.ingest(..), then:
//! channel.open()?;
//! # Ok(())
//! # }
//! ```

#![deny(unused_must_use)]

// Host test harness provides the critical-section implementation that the
// wakeup signal needs.
#[cfg(test)]
use critical_section as _;

pub mod adapters;
pub mod config;
pub mod error;
pub mod link;
pub mod opcodes;

pub use config::LinkConfig;
pub use error::{Error, ProtocolViolation, Result};
pub use link::channel::{ChannelState, LinkChannel};
pub use link::checksum::ChecksumKind;
pub use link::registry::{CommandTable, EventTable};
pub use link::transport::Transport;
