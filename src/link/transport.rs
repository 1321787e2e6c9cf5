//! Byte-link abstraction — any byte-oriented serial channel.
//!
//! Concrete implementations:
//! - UART driver glue on the target (IRQ read side feeds
//!   [`LinkChannel::ingest`](crate::link::channel::LinkChannel::ingest),
//!   the write side lives behind the channel's send lock)
//! - the in-memory duplex pair for host-side tests
//!
//! The channel only uses the write half; the read half is driven either by
//! the platform's receive interrupt or by the polling reader worker.

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;

    /// Write the whole buffer, retrying partial writes. Implementations
    /// must make forward progress on `write` for this to terminate.
    fn write_all(&mut self, mut data: &[u8]) -> Result<(), Self::Error> {
        while !data.is_empty() {
            let n = self.write(data)?;
            data = &data[n..];
        }
        Ok(())
    }
}

/// A null transport that discards all writes and never reads.
/// Useful as a stand-in while no peer is attached.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = core::convert::Infallible;

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn available(&self) -> bool {
        false
    }
}
