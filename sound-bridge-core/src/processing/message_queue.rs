use std::collections::VecDeque;

/// FIFO of PCM message blocks, the unit exchanged on graph ports.
///
/// Not synchronized: wrap in `parking_lot::Mutex` when shared with an
/// audio callback thread.
#[derive(Debug, Default)]
pub struct MessageQueue {
    blocks: VecDeque<Vec<u8>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, block: Vec<u8>) {
        self.blocks.push_back(block);
    }

    pub fn get(&mut self) -> Option<Vec<u8>> {
        self.blocks.pop_front()
    }

    /// Moves every block into `dest`, preserving order. Returns the number moved.
    pub fn drain_into(&mut self, dest: &mut MessageQueue) -> usize {
        let moved = self.blocks.len();
        dest.blocks.extend(self.blocks.drain(..));
        moved
    }

    /// Discards every block.
    pub fn flush(&mut self) {
        self.blocks.clear();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }
}
