//! Slave receive ring
//!
//! In slave role the controller has no notion of transfer length. Every received byte is
//! stored at the cursor, which wraps back to 0 once the ring is full.

/// Circular receive store with a runtime capacity of `1..=N` bytes
#[derive(Clone, Debug)]
pub struct SlaveRing<const N: usize> {
    buf: [u8; N],
    capacity: usize,
    cursor: usize,
    received: u32,
}

impl<const N: usize> SlaveRing<N> {
    /// Wrap after `capacity` bytes, clamped to `1..=N`. A zero-sized ring stores nothing.
    pub const fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { 1 } else { capacity };
        let capacity = if capacity > N { N } else { capacity };
        SlaveRing {
            buf: [0; N],
            capacity,
            cursor: 0,
            received: 0,
        }
    }

    /// Store `byte` at the cursor and advance it, wrapping at capacity
    #[inline]
    pub fn push(&mut self, byte: u8) {
        if let Some(slot) = self.buf.get_mut(self.cursor) {
            *slot = byte;
        }
        self.cursor += 1;
        if self.cursor >= self.capacity {
            self.cursor = 0;
        }
        self.received = self.received.wrapping_add(1);
    }

    /// Index the next byte will be stored at
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes stored before wrapping
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ring contents in storage order
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.capacity]
    }

    /// Bytes received since creation
    #[inline]
    pub fn received(&self) -> u32 {
        self.received
    }
}
