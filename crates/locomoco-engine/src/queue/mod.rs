//! Inbound message queue.
//!
//! Producers may live on any thread and only ever push. A single consumer
//! drains the queue once per tick on the render thread.

mod concurrent;

pub use concurrent::{MessageQueue, MessageSender};
