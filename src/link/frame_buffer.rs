//! Raw receive ring.
//!
//! Absorbs bytes from the byte source (typically an IRQ-fed UART callback)
//! independently of how fast the dispatch context drains them. Lock-free
//! SPSC: the producer is the ingest path and must never block; the consumer
//! is whichever context currently holds the channel's decode guard.
//!
//! Overflow policy: drop the newest byte. The source cannot be stalled on a
//! foreground/IRQ path, so a full ring is a documented data-loss boundary,
//! counted and reported via [`FrameBuffer::dropped`]. Bytes already buffered
//! are never disturbed.

use core::sync::atomic::{AtomicU8, AtomicU32, AtomicUsize, Ordering};

/// Bounded FIFO byte buffer between the ingest and dispatch contexts.
pub struct FrameBuffer {
    slots: Box<[AtomicU8]>,
    /// Next write position, free-running. Doubles as a monotonic count of
    /// bytes ever accepted, which the dispatcher uses to detect pushes that
    /// raced its drain pass.
    head: AtomicUsize,
    /// Next read position, free-running.
    tail: AtomicUsize,
    mask: usize,
    dropped: AtomicU32,
}

impl FrameBuffer {
    /// Create a ring with at least `capacity` bytes (rounded up to a power
    /// of two so the index math stays a mask).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let slots: Vec<AtomicU8> = (0..capacity).map(|_| AtomicU8::new(0)).collect();
        Self {
            slots: slots.into_boxed_slice(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            mask: capacity - 1,
            dropped: AtomicU32::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Append one byte. Producer side only.
    ///
    /// Returns `false` if the ring is full and the byte was dropped.
    pub fn push(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == self.capacity() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.slots[head & self.mask].store(byte, Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Remove the oldest byte. Consumer side only.
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        let byte = self.slots[tail & self.mask].load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    /// Drain up to `out.len()` bytes into `out`. Consumer side only.
    ///
    /// Returns the number of bytes copied. Used to pull a packet body into
    /// the channel's linear scratch buffer, since the body may straddle the
    /// ring's wraparound boundary.
    pub fn read_into(&self, out: &mut [u8]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.pop() {
                Some(byte) => {
                    out[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    /// Number of buffered bytes. Exact on the consumer side; a lower bound
    /// on the producer side while pushes race.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes ever accepted (monotonic, wraps at `usize::MAX`).
    pub fn push_seq(&self) -> usize {
        self.head.load(Ordering::Acquire)
    }

    /// Bytes dropped on overflow since creation.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
