//! In-memory duplex transport.
//!
//! Two crossed byte queues standing in for a serial line: what one end
//! writes, the other end reads. Used by the host-side tests and tooling;
//! clones share the same queues, so the read and write halves of one end
//! can live in different threads.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::link::transport::Transport;

type Queue = Arc<Mutex<VecDeque<u8>>>;

/// One end of an in-memory serial line.
#[derive(Clone)]
pub struct MemTransport {
    rx: Queue,
    tx: Queue,
}

impl MemTransport {
    /// Create a connected pair of ends.
    pub fn pair() -> (MemTransport, MemTransport) {
        let a_to_b: Queue = Arc::new(Mutex::new(VecDeque::new()));
        let b_to_a: Queue = Arc::new(Mutex::new(VecDeque::new()));
        (
            MemTransport {
                rx: Arc::clone(&b_to_a),
                tx: Arc::clone(&a_to_b),
            },
            MemTransport {
                rx: a_to_b,
                tx: b_to_a,
            },
        )
    }

    fn lock(queue: &Queue) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MemTransport {
    type Error = core::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut rx = Self::lock(&self.rx);
        let mut n = 0;
        while n < buf.len() {
            match rx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        Self::lock(&self.tx).extend(data.iter().copied());
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn available(&self) -> bool {
        !Self::lock(&self.rx).is_empty()
    }
}
