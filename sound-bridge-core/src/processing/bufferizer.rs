use std::collections::VecDeque;

use super::message_queue::MessageQueue;

/// Byte accumulator between graph input blocks and fixed-size device reads.
///
/// Unbounded; the playback callback bounds it by dropping the backlog.
/// Wrap in `Arc<parking_lot::Mutex<Bufferizer>>` for cross-thread access.
#[derive(Debug, Default)]
pub struct Bufferizer {
    bytes: VecDeque<u8>,
}

impl Bufferizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, data: &[u8]) {
        self.bytes.extend(data.iter().copied());
    }

    /// Appends every block queued in `queue`, leaving it empty.
    pub fn put_from_queue(&mut self, queue: &mut MessageQueue) {
        while let Some(block) = queue.get() {
            self.put(&block);
        }
    }

    /// Fills `dest` entirely if enough bytes are buffered.
    ///
    /// Returns the number of bytes read: `dest.len()` or 0. A partial read
    /// never happens.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        if self.bytes.len() < dest.len() {
            return 0;
        }
        let len = dest.len();
        for (slot, byte) in dest.iter_mut().zip(self.bytes.drain(..len)) {
            *slot = byte;
        }
        len
    }

    /// Discards up to `count` of the oldest bytes.
    pub fn skip(&mut self, count: usize) {
        let count = count.min(self.bytes.len());
        self.bytes.drain(..count);
    }

    /// Number of bytes available for reading.
    pub fn available(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn flush(&mut self) {
        self.bytes.clear();
    }
}
