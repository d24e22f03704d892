use crate::frame::Extent;

/// Startup parameters for the application.
///
/// Supplied once; afterwards the surface size only changes through
/// [`Message::Resize`](super::Message::Resize).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InitParams {
    /// Surface width in physical pixels.
    pub width: u32,

    /// Surface height in physical pixels.
    pub height: u32,
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Durable application state.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Surface width in physical pixels.
    pub width: u32,

    /// Surface height in physical pixels.
    pub height: u32,

    /// Display scale factor reported by the platform.
    pub scale_factor: f64,

    /// Number of messages applied since startup.
    pub revision: u64,
}

impl AppState {
    pub fn new(params: InitParams) -> Self {
        Self {
            width: params.width,
            height: params.height,
            scale_factor: 1.0,
            revision: 0,
        }
    }

    /// Surface extent requested by the current state.
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(InitParams::default())
    }
}
