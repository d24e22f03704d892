//! Locomoco engine crate.
//!
//! Frame orchestration for a single-window GPU app: a thread-safe message
//! queue feeding app state, and a frame scheduler that cycles a ring of
//! surface slots behind a monotonically increasing fence.

pub mod core;
pub mod device;
pub mod frame;
pub mod queue;
pub mod state;
pub mod time;
pub mod window;

pub mod logging;
