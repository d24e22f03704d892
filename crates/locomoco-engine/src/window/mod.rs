//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, turns window events into app
//! messages and ticks the app once per redraw.

mod runtime;

pub use runtime::{translate_window_event, EventContext, Runtime, RuntimeConfig};
pub use winit::window::CursorIcon;
