//! Recording backend for tests.
//!
//! Every backend call is appended to `calls`. Fence values complete only when
//! waited on, so a missing wait shows up as a reuse violation.

use std::fmt;

use anyhow::{bail, Result};

use super::{AcquireError, ClearColor, Extent, GpuBackend, ResourceState, SurfaceRecovery, UiLayer};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateSurface { extent: Extent, slots: usize },
    ReleaseSurface,
    CreateAllocator(usize),
    SlotImage(usize),
    CreateView(usize),
    CreateRecorder(usize),
    Acquire(usize),
    Barrier {
        slot: usize,
        before: ResourceState,
        after: ResourceState,
    },
    Clear { slot: usize, extent: Extent },
    BindRenderTarget(usize),
    UiRender(usize),
    Submit { recorder_slot: usize },
    Signal(u64),
    Present(usize),
    Wait(u64),
    ResetAllocator(usize),
    ResetRecorder(usize),
}

/// Injectable one-shot failures.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Fail {
    CreateSurface,
    CreateView(usize),
    Acquire,
    /// Acquire fails with a retryable classification.
    AcquireTimeout,
    /// Acquire fails with a fatal classification.
    AcquireOutOfMemory,
    Submit,
    Present,
}

#[derive(Debug)]
pub struct MockAllocator {
    pub slot: usize,
}

#[derive(Debug)]
pub struct MockRecorder {
    pub slot: usize,
    pub open: bool,
}

#[derive(Debug)]
pub struct MockImage {
    pub slot: usize,
}

#[derive(Debug)]
pub struct MockView {
    pub slot: usize,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    pub calls: Vec<Call>,
    pub violations: Vec<String>,

    slot_count: usize,
    current: usize,
    completed: u64,

    /// Recorder slot of the last submission not yet covered by a signal.
    pending_submit: Option<usize>,
    /// Last fence value signaled for work recorded against each slot.
    slot_fence: Vec<u64>,

    fail: Vec<Fail>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&mut self, fail: Fail) {
        self.fail.push(fail);
    }

    /// Moves the slot the surface reports next, as a platform may.
    pub fn set_current_slot(&mut self, slot: usize) {
        self.current = slot;
    }

    fn take(&mut self, fail: Fail) -> bool {
        match self.fail.iter().position(|f| *f == fail) {
            Some(i) => {
                self.fail.remove(i);
                true
            }
            None => false,
        }
    }

    fn check(&mut self, fail: Fail) -> Result<()> {
        if let Some(i) = self.fail.iter().position(|f| *f == fail) {
            self.fail.remove(i);
            bail!("injected failure: {fail:?}");
        }
        Ok(())
    }
}

impl GpuBackend for MockBackend {
    type Allocator = MockAllocator;
    type Recorder = MockRecorder;
    type Image = MockImage;
    type View = MockView;

    fn create_surface(&mut self, extent: Extent, slot_count: usize) -> Result<()> {
        self.check(Fail::CreateSurface)?;
        if extent.is_empty() {
            bail!("cannot configure a zero-size surface");
        }
        self.calls.push(Call::CreateSurface { extent, slots: slot_count });
        self.slot_count = slot_count;
        self.current %= slot_count;
        self.slot_fence = vec![0; slot_count];
        Ok(())
    }

    fn release_surface(&mut self) {
        self.calls.push(Call::ReleaseSurface);
    }

    fn create_allocator(&mut self, slot: usize) -> Result<MockAllocator> {
        self.calls.push(Call::CreateAllocator(slot));
        Ok(MockAllocator { slot })
    }

    fn slot_image(&mut self, slot: usize) -> Result<MockImage> {
        self.calls.push(Call::SlotImage(slot));
        Ok(MockImage { slot })
    }

    fn create_view(&mut self, image: &MockImage, slot: usize) -> Result<MockView> {
        self.check(Fail::CreateView(slot))?;
        self.calls.push(Call::CreateView(slot));
        Ok(MockView { slot: image.slot })
    }

    fn create_recorder(&mut self, allocator: &MockAllocator) -> Result<MockRecorder> {
        self.calls.push(Call::CreateRecorder(allocator.slot));
        Ok(MockRecorder {
            slot: allocator.slot,
            open: true,
        })
    }

    fn current_slot(&self) -> usize {
        self.current
    }

    fn acquire(&mut self, slot: usize) -> Result<()> {
        self.check(Fail::Acquire)?;
        if self.take(Fail::AcquireTimeout) {
            return Err(AcquireError::new(slot, SurfaceRecovery::Retry, fmt::Error).into());
        }
        if self.take(Fail::AcquireOutOfMemory) {
            return Err(AcquireError::new(slot, SurfaceRecovery::Fatal, fmt::Error).into());
        }
        self.calls.push(Call::Acquire(slot));
        Ok(())
    }

    fn barrier(
        &mut self,
        recorder: &mut MockRecorder,
        image: &MockImage,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()> {
        if !recorder.open {
            bail!("barrier on closed recorder");
        }
        self.calls.push(Call::Barrier {
            slot: image.slot,
            before,
            after,
        });
        Ok(())
    }

    fn clear(
        &mut self,
        recorder: &mut MockRecorder,
        view: &MockView,
        _color: ClearColor,
        extent: Extent,
    ) -> Result<()> {
        if !recorder.open {
            bail!("clear on closed recorder");
        }
        self.calls.push(Call::Clear {
            slot: view.slot,
            extent,
        });
        Ok(())
    }

    fn bind_render_target(&mut self, _recorder: &mut MockRecorder, view: &MockView) -> Result<()> {
        self.calls.push(Call::BindRenderTarget(view.slot));
        Ok(())
    }

    fn submit(&mut self, recorder: &mut MockRecorder) -> Result<()> {
        self.check(Fail::Submit)?;
        if !recorder.open {
            bail!("submit of closed recorder");
        }
        recorder.open = false;
        self.pending_submit = Some(recorder.slot);
        self.calls.push(Call::Submit {
            recorder_slot: recorder.slot,
        });
        Ok(())
    }

    fn signal(&mut self, value: u64) -> Result<()> {
        if let Some(slot) = self.pending_submit.take() {
            self.slot_fence[slot] = value;
        }
        self.calls.push(Call::Signal(value));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.check(Fail::Present)?;
        self.calls.push(Call::Present(self.current));
        self.current = (self.current + 1) % self.slot_count.max(1);
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.completed
    }

    fn wait_for_fence(&mut self, value: u64) -> Result<()> {
        self.calls.push(Call::Wait(value));
        self.completed = self.completed.max(value);
        Ok(())
    }

    fn reset_allocator(&mut self, allocator: &mut MockAllocator) -> Result<()> {
        let outstanding = self.slot_fence.get(allocator.slot).copied().unwrap_or(0);
        if self.completed < outstanding {
            self.violations.push(format!(
                "slot {} reset at completed {} with fence {outstanding} outstanding",
                allocator.slot, self.completed
            ));
        }
        self.calls.push(Call::ResetAllocator(allocator.slot));
        Ok(())
    }

    fn reset_recorder(
        &mut self,
        recorder: &mut MockRecorder,
        allocator: &MockAllocator,
    ) -> Result<()> {
        recorder.slot = allocator.slot;
        recorder.open = true;
        self.calls.push(Call::ResetRecorder(allocator.slot));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockUi {
    pub new_frames: usize,
    pub draw_calls: usize,
    pub renders: usize,
    pub scale_changes: Vec<f64>,
    pub shut_down: bool,
}

impl UiLayer<MockBackend> for MockUi {
    fn new_frame(&mut self) {
        self.new_frames += 1;
    }

    fn draw(&mut self) {
        self.draw_calls += 1;
    }

    fn scale_factor_changed(&mut self, scale: f64) {
        self.scale_changes.push(scale);
    }

    fn render(
        &mut self,
        backend: &mut MockBackend,
        recorder: &mut MockRecorder,
        view: &MockView,
    ) -> Result<()> {
        if !recorder.open {
            bail!("ui render on closed recorder");
        }
        backend.calls.push(Call::UiRender(view.slot));
        self.renders += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
    }
}
