/// Surface size in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area extent cannot back a surface (minimized windows report one).
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Linear RGBA clear color.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

/// Usage state of a slot's backing image.
///
/// Transitions are declared through [`GpuBackend::barrier`](super::GpuBackend::barrier).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceState {
    /// Owned by the presentation engine.
    Present,
    /// Writable as a color attachment.
    RenderTarget,
}

/// Outcome of a frame step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    /// `begin_frame` succeeded; the recorder is open for the UI.
    Recording,
    /// Frame was submitted and presented.
    Presented,
    /// Nothing was recorded (not initialized, or zero-size surface).
    Skipped,
    /// A backend call failed; frames are skipped until the surface is rebuilt.
    Degraded,
    /// The surface cannot be recovered. The caller should shut down.
    Lost,
}
