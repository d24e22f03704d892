use super::{AppState, FrameState};

/// State mutation command.
///
/// Produced by event translation (any thread), consumed exactly once by the
/// render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Surface was resized to `width` x `height` physical pixels.
    Resize { width: u32, height: u32 },

    /// Display scale factor changed.
    ScaleFactorChanged { scale: f64 },

    /// Leave the main loop after the current tick.
    RequestExit,
}

impl Message {
    /// Applies this message, consuming it.
    pub fn apply(self, state: &mut AppState, frame: &mut FrameState) {
        match self {
            Message::Resize { width, height } => {
                state.width = width;
                state.height = height;
                frame.size_dirty = true;
            }

            Message::ScaleFactorChanged { scale } => {
                state.scale_factor = scale;
                frame.scale_dirty = true;
            }

            Message::RequestExit => {
                frame.exit_requested = true;
            }
        }

        state.revision += 1;
    }
}
