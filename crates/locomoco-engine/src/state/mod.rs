//! Application state.
//!
//! `AppState` survives across frames. `FrameState` is rebuilt every tick from
//! the messages applied during that tick. Messages are the only way to mutate
//! either.

mod app_state;
mod frame_state;
mod message;

pub use app_state::{AppState, InitParams};
pub use frame_state::FrameState;
pub use message::Message;
