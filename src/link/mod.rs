//! Framed transport core.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Link Stack                            │
//! │                                                              │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────────┐ │
//! │  │ ByteSource │──▶│ FrameBuffer│──▶│ HeaderSync → Channel │ │
//! │  │ (IRQ/poll) │   │ (SPSC ring)│   │ (deferred dispatch)  │ │
//! │  └────────────┘   └────────────┘   └──────────┬───────────┘ │
//! │        ▲                                      │             │
//! │        │          ┌────────────┐   ┌──────────▼───────────┐ │
//! │        └──────────│ Transport  │◀──│ Sender (one lock per │ │
//! │          (peer)   │ (write)    │   │ channel, no interleave)│
//! │                   └────────────┘   └──────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod channel;
pub mod checksum;
pub mod frame_buffer;
pub mod header;
pub mod packet;
pub mod pool;
pub mod registry;
pub mod transport;
pub mod worker;
