use anyhow::{Context, Result};

use super::GpuBackend;

/// Per-image GPU resources.
pub struct FrameSlot<B: GpuBackend> {
    pub allocator: B::Allocator,
    pub image: B::Image,
    pub view: B::View,

    /// Fence value of the last submission recorded with `allocator`.
    /// `0` if the slot was never submitted.
    pub fence_value: u64,
}

impl<B: GpuBackend> FrameSlot<B> {
    fn create(backend: &mut B, index: usize) -> Result<Self> {
        let allocator = backend
            .create_allocator(index)
            .with_context(|| format!("failed to create command allocator for slot {index}"))?;
        let image = backend
            .slot_image(index)
            .with_context(|| format!("failed to get surface image for slot {index}"))?;
        let view = backend
            .create_view(&image, index)
            .with_context(|| format!("failed to create render target view for slot {index}"))?;

        Ok(Self {
            allocator,
            image,
            view,
            fence_value: 0,
        })
    }

    /// Builds all `count` slots, or none.
    pub fn create_ring(backend: &mut B, count: usize) -> Result<Vec<Self>> {
        (0..count).map(|i| Self::create(backend, i)).collect()
    }
}
