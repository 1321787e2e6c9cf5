//! Framed RPC channel — ingest path, deferred dispatcher, send path.
//!
//! ```text
//! byte source (IRQ-fed)                  deferred worker
//!        │ ingest(byte)                        │ service()
//!        ▼                                     ▼
//!  ┌─────────────┐   header    ┌─────────┐  dispatch  ┌───────────────┐
//!  │ FrameBuffer │──complete──▶│ scratch │───────────▶│ handler tables│
//!  └─────────────┘             └─────────┘            └───────┬───────┘
//!                                                             │ RSP / EVT / LOG
//!                                                     ┌───────▼───────┐
//!                                                     │ send lock ─▶ TX│
//!                                                     └───────────────┘
//! ```
//!
//! Two execution contexts share one channel value. The ingest context is
//! fed asynchronously, must never block, and does at most a bounded amount
//! of header scanning per byte. The dispatch context is a single deferred
//! consumer: at most one dispatch is in flight per channel, packets are
//! handled in the order their headers validated, and each dispatch drains
//! any backlog before yielding.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, error, info, warn};

use crate::config::LinkConfig;
use crate::error::{Error, ProtocolViolation, Result};
use crate::link::frame_buffer::FrameBuffer;
use crate::link::header::{FRAME_MAGIC, FrameHeader, HeaderSync};
use crate::link::packet::{HANDSHAKE_OPCODE, LOG_OPCODE, PACKET_HEADER_LEN, PacketType};
use crate::link::pool::{BufferPool, PacketBuf};
use crate::link::registry::{CommandTable, EventTable, HandlerRegistry};
use crate::link::transport::Transport;

/// Channel lifecycle. There is no way back: a channel either comes up once
/// or is torn down with the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// Byte source not armed yet; nothing may be sent.
    Uninitialized = 0,
    /// Byte source armed, handshake in flight; only control packets pass.
    Initializing = 1,
    /// Handshake acknowledged; payload packets flow.
    Initialized = 2,
}

impl ChannelState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            _ => Self::Initialized,
        }
    }
}

/// Receive-side state owned by whichever context currently decodes.
///
/// The ingest path takes it with `try_lock` (never blocks); the dispatcher
/// takes it blocking. The `pending` latch guarantees they do not contend in
/// steady state.
struct DecodeState {
    sync: HeaderSync,
    /// Linear packet buffer, reused for the channel's lifetime. Bodies are
    /// copied here because they may straddle the ring's wraparound and the
    /// handlers need one contiguous range.
    scratch: Vec<u8>,
}

/// One framed link instance: buffers, state machine, handler tables and the
/// send lock.
pub struct LinkChannel<T: Transport> {
    config: LinkConfig,
    state: AtomicU8,
    /// Latched by a fatal protocol violation; never cleared.
    poisoned: AtomicBool,
    rx: FrameBuffer,
    decode: Mutex<DecodeState>,
    /// True while a completed frame awaits (or undergoes) dispatch. The
    /// ingest path stops decoding while set, which is the only backpressure
    /// on this channel: one in-flight dispatch, never two.
    pending: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
    tx: Mutex<T>,
    pool: BufferPool,
    registry: HandlerRegistry,
}

impl<T: Transport> LinkChannel<T> {
    /// Create a channel over the write half of `transport`.
    ///
    /// The channel starts `Uninitialized`; register handlers, then call
    /// [`open`](Self::open) once the byte source is armed.
    pub fn new(config: LinkConfig, transport: T) -> Self {
        let rx = FrameBuffer::with_capacity(config.rx_ring_capacity);
        let pool = BufferPool::new(config.pool_buffers, config.pool_buffer_size);
        let scratch = vec![0u8; config.max_packet_size];
        Self {
            config,
            state: AtomicU8::new(ChannelState::Uninitialized as u8),
            poisoned: AtomicBool::new(false),
            rx,
            decode: Mutex::new(DecodeState {
                sync: HeaderSync::new(),
                scratch,
            }),
            pending: AtomicBool::new(false),
            wake: Signal::new(),
            tx: Mutex::new(transport),
            pool,
            registry: HandlerRegistry::new(),
        }
    }

    /// Replace the command handler table. Requires exclusive access, so
    /// registration can only happen before the channel is shared with the
    /// byte source and workers.
    pub fn register_command_handlers(&mut self, table: CommandTable) {
        self.registry.set_command_handlers(table);
    }

    /// Replace the event handler table. Same access rule as
    /// [`register_command_handlers`](Self::register_command_handlers).
    pub fn register_event_handlers(&mut self, table: EventTable) {
        self.registry.set_event_handlers(table);
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once the handshake has completed and payload packets may flow.
    pub fn is_available(&self) -> bool {
        self.state() == ChannelState::Initialized
    }

    /// Bytes lost to receive-ring overflow since creation.
    pub fn rx_dropped(&self) -> u32 {
        self.rx.dropped()
    }

    /// Take an outbound packet buffer sized for `payload_size` bytes.
    pub fn alloc_buf(&self, payload_size: usize) -> Result<PacketBuf> {
        self.pool.alloc(payload_size)
    }

    /// Arm the channel and start the handshake.
    ///
    /// Call once the byte source is delivering into [`ingest`](Self::ingest).
    /// Moves `Uninitialized → Initializing` and sends the INIT control
    /// packet; the channel opens when the peer's INITRSP arrives.
    pub fn open(&self) -> Result<()> {
        self.state
            .compare_exchange(
                ChannelState::Uninitialized as u8,
                ChannelState::Initializing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| Error::Config("channel already opened"))?;

        info!("link armed, sending handshake");
        let buf = self.pool.alloc(0)?;
        self.send(buf, PacketType::Init, HANDSHAKE_OPCODE)
    }

    // ── Ingest context ────────────────────────────────────────

    /// Accept one byte from the byte source.
    ///
    /// Safe to call from a preemptive context: the ring push is lock-free,
    /// and the decode state is only taken with `try_lock`. When a complete
    /// frame (header plus body) is buffered, the dispatch worker is
    /// signalled and further decoding is suppressed until it finishes.
    pub fn ingest(&self, byte: u8) {
        if !self.rx.push(byte) {
            debug!("rx ring full, byte dropped");
        }
        if self.poisoned.load(Ordering::Relaxed) {
            return;
        }
        if self.pending.load(Ordering::Acquire) {
            // A dispatch is in flight; it re-scans the ring itself.
            return;
        }
        if let Ok(mut st) = self.decode.try_lock() {
            if self.frame_ready(&mut st) {
                self.pending.store(true, Ordering::Release);
                self.wake.signal(());
            }
        }
        // A contended try_lock means the dispatcher holds the decode state
        // right now and will see this byte during its own drain.
    }

    /// Advance header sync against the ring. True when a full frame
    /// (validated header and `len` buffered body bytes) is available.
    fn frame_ready(&self, st: &mut DecodeState) -> bool {
        loop {
            if !st.sync.sync(&self.rx) {
                return false;
            }
            let len = usize::from(st.sync.header().len);
            if len < PACKET_HEADER_LEN || len > self.config.max_packet_size {
                // Corrupt length field: too short to carry type+opcode, or
                // larger than anything a peer may legally send. Drop the
                // header and keep scanning.
                warn!("discarding frame with bad length {len}");
                st.sync.reset();
                continue;
            }
            return self.rx.len() >= len;
        }
    }

    // ── Deferred context ──────────────────────────────────────

    /// Run the deferred dispatcher until the ring holds no more complete
    /// frames.
    ///
    /// This is the single consumer: handlers run here, run-to-completion,
    /// never concurrently with each other. Outbound failures inside a
    /// dispatch are logged, not returned; an error from this function
    /// always means the peer broke protocol, the channel is poisoned and
    /// the caller should stop servicing it.
    pub fn service(&self) -> Result<()> {
        loop {
            let seq_before;
            {
                let mut st = self.decode.lock().unwrap_or_else(|e| e.into_inner());
                seq_before = self.rx.push_seq();
                while self.frame_ready(&mut st) {
                    self.process_one(&mut st)?;
                }
                self.pending.store(false, Ordering::Release);
            }
            // Bytes that arrived while `pending` was still set never
            // triggered an ingest-side decode; re-check instead of waiting
            // for the next byte.
            if self.rx.push_seq() == seq_before {
                return Ok(());
            }
            if self
                .pending
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Ok(());
            }
        }
    }

    /// Copy one frame out of the ring and dispatch it. Header state is
    /// reset afterwards regardless of the outcome, so the next marker
    /// search starts clean.
    fn process_one(&self, st: &mut DecodeState) -> Result<()> {
        let header = *st.sync.header();
        let len = usize::from(header.len);

        let copied = self.rx.read_into(&mut st.scratch[..len]);
        debug_assert_eq!(copied, len);

        let result = self.handle_packet(&header, &st.scratch[..len]);
        st.sync.reset();

        if let Err(err) = result {
            if matches!(err, Error::Protocol(_)) {
                self.poisoned.store(true, Ordering::Release);
                error!("channel down: {err}");
            }
            return Err(err);
        }
        Ok(())
    }

    fn handle_packet(&self, header: &FrameHeader, body: &[u8]) -> Result<()> {
        if !self
            .config
            .checksum
            .verify(header.len, body, header.checksum)
        {
            warn!("frame checksum mismatch, dropping");
            return Ok(());
        }

        let raw_type = body[0];
        let opcode = u16::from_le_bytes([body[1], body[2]]);
        let payload = &body[PACKET_HEADER_LEN..];

        let Some(ptype) = PacketType::from_wire(raw_type) else {
            return Err(ProtocolViolation::UnknownPacketType(raw_type).into());
        };

        debug!(
            "rx {ptype:?} opcode {opcode:#x} ({} payload bytes)",
            payload.len()
        );

        match ptype {
            PacketType::InitRsp => {
                info!("got init rsp, channel is now open");
                self.state
                    .store(ChannelState::Initialized as u8, Ordering::Release);
                Ok(())
            }
            PacketType::Init => {
                info!("got peer-initiated init, answering");
                match self.pool.alloc(0) {
                    Ok(buf) => {
                        if let Err(err) = self.send(buf, PacketType::InitRsp, HANDSHAKE_OPCODE) {
                            error!("init response not sent: {err}");
                        }
                    }
                    Err(err) => error!("no buffer for init response: {err}"),
                }
                Ok(())
            }
            PacketType::Ack => {
                // Reserved for flow control in the target→host direction;
                // nothing to do until a retry scheme exists.
                debug!("got ack for opcode {opcode:#x}");
                Ok(())
            }
            PacketType::Cmd => {
                let Some(handler) = self.registry.command(opcode) else {
                    return Err(ProtocolViolation::UnhandledCommand(opcode).into());
                };
                let status = handler(payload);
                if status != 0 {
                    warn!("command {opcode:#x} handler returned {status}");
                }
                // The RSP round trip is mandatory, success or not.
                let mut rsp = match self.pool.alloc(1) {
                    Ok(buf) => buf,
                    Err(err) => {
                        error!("no buffer for {opcode:#x} response: {err}");
                        return Ok(());
                    }
                };
                let _ = rsp.extend_from_slice(&[status as u8]);
                if let Err(err) = self.send_rsp(rsp, opcode) {
                    error!("response for {opcode:#x} not sent: {err}");
                }
                Ok(())
            }
            PacketType::Evt => {
                let Some(handler) = self.registry.event(opcode) else {
                    return Err(ProtocolViolation::UnhandledEvent(opcode).into());
                };
                handler(payload);
                Ok(())
            }
            PacketType::Rsp | PacketType::Err | PacketType::Log => {
                // This role never issues commands, so nothing may answer it.
                Err(ProtocolViolation::UnexpectedDirection(ptype).into())
            }
        }
    }

    // ── Send path ─────────────────────────────────────────────

    /// Send a spontaneous event to the peer.
    pub fn send_event(&self, buf: PacketBuf, opcode: u16) -> Result<()> {
        self.send(buf, PacketType::Evt, opcode)
    }

    /// Send a command response. Normally issued by the dispatcher itself;
    /// exposed for handlers that complete asynchronously.
    pub fn send_rsp(&self, buf: PacketBuf, opcode: u16) -> Result<()> {
        self.send(buf, PacketType::Rsp, opcode)
    }

    /// Best-effort: forward a formatted diagnostic line as a LOG packet.
    /// Lines are silently discarded until the handshake completes.
    pub fn send_log(&self, buf: PacketBuf) -> Result<()> {
        match self.send(buf, PacketType::Log, LOG_OPCODE) {
            Err(Error::NotConnected) => Ok(()),
            other => other,
        }
    }

    /// Announce boot completion with an empty READY event.
    pub fn send_ready_event(&self) -> Result<()> {
        let buf = self.pool.alloc(0)?;
        self.send_event(buf, crate::opcodes::EVT_READY)
    }

    /// Prepend the packet and wire headers, then write the frame under the
    /// channel's send lock so concurrent senders never interleave bytes.
    fn send(&self, mut buf: PacketBuf, ptype: PacketType, opcode: u16) -> Result<()> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(Error::ChannelDown);
        }
        let state = self.state();
        match ptype {
            // The handshake packets bootstrap the channel and only need the
            // byte source armed.
            PacketType::Init | PacketType::InitRsp => {
                if state == ChannelState::Uninitialized {
                    return Err(Error::NotConnected);
                }
            }
            _ => {
                if state != ChannelState::Initialized {
                    return Err(Error::NotConnected);
                }
            }
        }

        // Packet header, prepended so the payload stays where the handler
        // wrote it.
        buf.push_u16_le(opcode);
        buf.push_u8(ptype.wire_value());

        // Wire header, outermost field pushed last.
        let body_len = buf.len() as u16;
        let checksum = self.config.checksum.frame_checksum(body_len, buf.as_wire());
        buf.push_u8(checksum);
        buf.push_u16_le(body_len);
        for &b in FRAME_MAGIC.iter().rev() {
            buf.push_u8(b);
        }

        let mut tx = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        debug!("tx {ptype:?} opcode {opcode:#x}, {} bytes", buf.len());
        tx.write_all(buf.as_wire()).map_err(|err| {
            error!("transport write failed: {err:?}");
            Error::TransportWrite
        })?;
        tx.flush().map_err(|err| {
            error!("transport flush failed: {err:?}");
            Error::TransportWrite
        })
    }

    // ── Worker plumbing ───────────────────────────────────────

    pub(crate) fn wake_signal(&self) -> &Signal<CriticalSectionRawMutex, ()> {
        &self.wake
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }
}
