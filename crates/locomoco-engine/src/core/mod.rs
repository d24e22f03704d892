//! Per-tick orchestration.
//!
//! `App` ties the message queue, the state store and the frame scheduler
//! together. The window runtime calls `update` then `draw` once per redraw.

mod app;

pub use app::App;
