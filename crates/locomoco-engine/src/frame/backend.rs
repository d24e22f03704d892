use anyhow::Result;

use super::{ClearColor, Extent, ResourceState};

/// GPU capabilities the frame scheduler drives.
///
/// Implementations wrap a device, a work queue, a presentation surface and a
/// fence. The scheduler owns every per-slot resource handed out here; the
/// backend owns the surface itself.
///
/// All calls happen on the render thread.
pub trait GpuBackend {
    /// Per-slot command memory. Reset only once the slot's fence completed.
    type Allocator;

    /// The shared command recorder, reopened against one allocator per frame.
    type Recorder;

    /// Backing image of a surface slot.
    type Image;

    /// Render-target view of a slot image.
    type View;

    /// Creates the presentation surface with `slot_count` images.
    fn create_surface(&mut self, extent: Extent, slot_count: usize) -> Result<()>;

    /// Releases the surface and anything the backend holds for it.
    ///
    /// Callers must have drained outstanding GPU work first.
    fn release_surface(&mut self);

    fn create_allocator(&mut self, slot: usize) -> Result<Self::Allocator>;

    fn slot_image(&mut self, slot: usize) -> Result<Self::Image>;

    fn create_view(&mut self, image: &Self::Image, slot: usize) -> Result<Self::View>;

    /// Creates the shared recorder, open against `allocator`.
    fn create_recorder(&mut self, allocator: &Self::Allocator) -> Result<Self::Recorder>;

    /// Index of the surface image that will be rendered next.
    fn current_slot(&self) -> usize;

    /// Makes the current slot image available for recording.
    fn acquire(&mut self, slot: usize) -> Result<()>;

    fn barrier(
        &mut self,
        recorder: &mut Self::Recorder,
        image: &Self::Image,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()>;

    /// Clears `view` over `extent`.
    fn clear(
        &mut self,
        recorder: &mut Self::Recorder,
        view: &Self::View,
        color: ClearColor,
        extent: Extent,
    ) -> Result<()>;

    fn bind_render_target(&mut self, recorder: &mut Self::Recorder, view: &Self::View) -> Result<()>;

    /// Closes the recorder and submits it to the queue.
    fn submit(&mut self, recorder: &mut Self::Recorder) -> Result<()>;

    /// Signals `value` on the fence once previously submitted work completes.
    fn signal(&mut self, value: u64) -> Result<()>;

    fn present(&mut self) -> Result<()>;

    /// Highest fence value the GPU has completed.
    fn completed_value(&self) -> u64;

    /// Blocks until the fence reaches `value`. No timeout.
    fn wait_for_fence(&mut self, value: u64) -> Result<()>;

    fn reset_allocator(&mut self, allocator: &mut Self::Allocator) -> Result<()>;

    /// Reopens `recorder` against `allocator`.
    fn reset_recorder(
        &mut self,
        recorder: &mut Self::Recorder,
        allocator: &Self::Allocator,
    ) -> Result<()>;
}

/// Immediate-mode UI layer drawn on top of the cleared surface.
pub trait UiLayer<B: GpuBackend> {
    /// Starts a new UI frame. Called by `begin_frame` after the clear.
    fn new_frame(&mut self) {}

    /// Issues the frame's immediate-mode draw calls.
    ///
    /// This is what the per-frame draw callback usually runs. It must not
    /// submit or present.
    fn draw(&mut self) {}

    /// The display scale factor changed (also sent once at startup).
    fn scale_factor_changed(&mut self, _scale: f64) {}

    /// Records the frame's draw data into `recorder` targeting `view`.
    fn render(&mut self, backend: &mut B, recorder: &mut B::Recorder, view: &B::View) -> Result<()>;

    /// Releases UI resources. Called once, after GPU work is drained.
    fn shutdown(&mut self) {}
}

impl<B, T> UiLayer<B> for Box<T>
where
    B: GpuBackend,
    T: UiLayer<B> + ?Sized,
{
    fn new_frame(&mut self) {
        (**self).new_frame()
    }

    fn draw(&mut self) {
        (**self).draw()
    }

    fn scale_factor_changed(&mut self, scale: f64) {
        (**self).scale_factor_changed(scale)
    }

    fn render(&mut self, backend: &mut B, recorder: &mut B::Recorder, view: &B::View) -> Result<()> {
        (**self).render(backend, recorder, view)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// UI layer that records nothing.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoUi;

impl<B: GpuBackend> UiLayer<B> for NoUi {
    fn render(&mut self, _: &mut B, _: &mut B::Recorder, _: &B::View) -> Result<()> {
        Ok(())
    }
}
