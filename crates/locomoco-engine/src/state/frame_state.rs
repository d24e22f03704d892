/// Per-tick flags derived from message application.
///
/// Reset to `Default` at the start of every tick, before the queue is drained.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct FrameState {
    /// A resize message was applied this tick.
    ///
    /// Raised even if the new size equals the old one.
    pub size_dirty: bool,

    /// A scale factor change was applied this tick.
    pub scale_dirty: bool,

    /// Exit was requested this tick.
    pub exit_requested: bool,
}

impl FrameState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Returns true when no message touched this frame.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}
