pub mod bufferizer;
pub mod clock_sync;
pub mod message_queue;
