//! Outbound packet buffers.
//!
//! Every buffer reserves headroom for the two stacked headers that the send
//! path prepends: the 3-byte packet header (type + opcode) and the 7-byte
//! wire header (marker + length + checksum). Handlers append their payload
//! and never touch the headroom.
//!
//! The pool is a fixed budget of buffers; exhaustion is an error returned
//! to the caller, never a block, since event producers run in contexts
//! that cannot wait.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::link::header::WIRE_HEADER_LEN;
use crate::link::packet::PACKET_HEADER_LEN;

/// Headroom reserved in every buffer for the packet and wire headers.
pub const BUF_RESERVE: usize = PACKET_HEADER_LEN + WIRE_HEADER_LEN;

/// Fixed budget of outbound packet buffers.
#[derive(Debug)]
pub struct BufferPool {
    buf_size: usize,
    free: Arc<AtomicUsize>,
}

impl BufferPool {
    pub fn new(buffers: usize, buf_size: usize) -> Self {
        Self {
            buf_size,
            free: Arc::new(AtomicUsize::new(buffers)),
        }
    }

    /// Take a buffer sized for a `payload_size`-byte payload.
    ///
    /// Fails with [`Error::PacketTooLarge`] if the payload cannot fit next
    /// to the reserved headroom, or [`Error::NoBuffers`] when the budget is
    /// spent. Buffers check back in when dropped.
    pub fn alloc(&self, payload_size: usize) -> Result<PacketBuf> {
        if payload_size + BUF_RESERVE > self.buf_size {
            return Err(Error::PacketTooLarge);
        }

        let mut free = self.free.load(Ordering::Relaxed);
        loop {
            if free == 0 {
                return Err(Error::NoBuffers);
            }
            match self.free.compare_exchange_weak(
                free,
                free - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => free = current,
            }
        }

        let mut data = Vec::with_capacity(self.buf_size);
        data.resize(BUF_RESERVE, 0);
        Ok(PacketBuf {
            data,
            start: BUF_RESERVE,
            limit: self.buf_size,
            pool: Arc::clone(&self.free),
        })
    }

    pub fn free_buffers(&self) -> usize {
        self.free.load(Ordering::Relaxed)
    }
}

/// One outbound packet under construction.
///
/// Payload bytes append after the headroom; the send path fills the
/// headroom by prepending the two headers just before the frame goes out.
#[derive(Debug)]
pub struct PacketBuf {
    data: Vec<u8>,
    /// Offset of the first used byte; prepends move it toward zero.
    start: usize,
    limit: usize,
    pool: Arc<AtomicUsize>,
}

impl PacketBuf {
    /// Prepend one byte into the headroom.
    pub fn push_u8(&mut self, value: u8) {
        assert!(self.start > 0, "packet headroom exhausted");
        self.start -= 1;
        self.data[self.start] = value;
    }

    /// Prepend a little-endian u16 into the headroom.
    pub fn push_u16_le(&mut self, value: u16) {
        assert!(self.start >= 2, "packet headroom exhausted");
        let bytes = value.to_le_bytes();
        self.start -= 2;
        self.data[self.start] = bytes[0];
        self.data[self.start + 1] = bytes[1];
    }

    /// Append payload bytes.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if self.data.len() + bytes.len() > self.limit {
            return Err(Error::PacketTooLarge);
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Used bytes, prepended headers included.
    pub fn len(&self) -> usize {
        self.data.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining headroom in front of the packet.
    pub fn headroom(&self) -> usize {
        self.start
    }

    /// The bytes as they will appear on the wire.
    pub fn as_wire(&self) -> &[u8] {
        &self.data[self.start..]
    }
}

impl Drop for PacketBuf {
    fn drop(&mut self) {
        self.pool.fetch_add(1, Ordering::Release);
    }
}
