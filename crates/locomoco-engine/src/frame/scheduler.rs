use anyhow::{Context, Result};

use crate::state::{AppState, FrameState};

use super::{
    AcquireError, ClearColor, Extent, FenceCounter, FrameSlot, FrameStatus, GpuBackend,
    ResourceState, SurfaceRecovery, UiLayer,
};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Background color every slot is cleared to at frame begin.
    pub clear_color: ClearColor,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            clear_color: ClearColor::black(),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    Uninitialized,
    Ready,
    Recording { slot: usize },
    Degraded,
    Lost,
}

/// Drives one frame at a time through a ring of `SLOTS` surface images.
///
/// Per frame:
/// - `begin_frame`: pick the current slot, transition its image to a render
///   target and clear it
/// - the caller runs its UI draw callback
/// - `end_frame`: record UI, transition back to present, submit, signal the
///   fence, present, block until the fence completes, then reopen the recorder
///   against the next slot
///
/// Only one frame is ever in flight. The blocking wait at the end of
/// `end_frame` is what makes reusing a slot's allocator safe.
pub struct FrameScheduler<B: GpuBackend, const SLOTS: usize = 2> {
    backend: B,
    config: SchedulerConfig,

    phase: Phase,
    extent: Extent,

    slots: Vec<FrameSlot<B>>,

    /// Shared recorder; `None` while the surface is released.
    recorder: Option<B::Recorder>,

    /// Slot whose allocator `recorder` is currently open against.
    open_slot: usize,

    fence: FenceCounter,
}

impl<B: GpuBackend, const SLOTS: usize> FrameScheduler<B, SLOTS> {
    /// Creates an uninitialized scheduler. Call [`initialize`](Self::initialize)
    /// before rendering.
    pub fn new(backend: B, config: SchedulerConfig) -> Self {
        Self {
            backend,
            config,
            phase: Phase::Uninitialized,
            extent: Extent::default(),
            slots: Vec::with_capacity(SLOTS),
            recorder: None,
            open_slot: 0,
            fence: FenceCounter::new(),
        }
    }

    /// Creates the surface, all slots and the recorder.
    ///
    /// A zero-size extent (a window created minimized) initializes without a
    /// surface; it is built by the first non-empty resize. Any failure leaves
    /// the scheduler uninitialized.
    pub fn initialize(&mut self, extent: Extent) -> Result<()> {
        anyhow::ensure!(SLOTS > 0, "frame scheduler needs at least one slot");
        anyhow::ensure!(
            self.phase == Phase::Uninitialized,
            "frame scheduler is already initialized"
        );

        if extent.is_empty() {
            self.extent = extent;
            self.phase = Phase::Ready;
            log::info!("frame scheduler initialized without a surface (zero-size extent)");
            return Ok(());
        }

        if let Err(e) = self.build_surface(extent) {
            self.release_surface();
            return Err(e.context("failed to initialize frame scheduler"));
        }

        self.phase = Phase::Ready;
        log::info!(
            "frame scheduler initialized: {}x{}, {SLOTS} slots",
            extent.width,
            extent.height
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.phase != Phase::Uninitialized
    }

    pub fn is_degraded(&self) -> bool {
        self.phase == Phase::Degraded
    }

    /// The surface failed beyond recovery; only `finalize` is meaningful.
    pub fn is_lost(&self) -> bool {
        self.phase == Phase::Lost
    }

    /// Number of surface slots.
    pub fn slot_count(&self) -> usize {
        SLOTS
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Last fence value issued.
    pub fn fence_value(&self) -> u64 {
        self.fence.current()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Recreates the surface when this tick's messages asked for it, or when a
    /// previous failure left the scheduler degraded.
    pub fn sync_surface(&mut self, state: &AppState, frame: &FrameState) -> Result<()> {
        if !self.is_initialized() || self.is_lost() {
            return Ok(());
        }

        if frame.size_dirty || self.is_degraded() {
            self.resize(state.extent())?;
        }

        Ok(())
    }

    /// Drains GPU work, releases every slot and rebuilds the surface at `extent`.
    ///
    /// A zero-size extent releases the surface and leaves it released; frames
    /// are skipped until a non-empty resize arrives. On failure the scheduler is
    /// degraded and the next `sync_surface` retries.
    pub fn resize(&mut self, extent: Extent) -> Result<()> {
        anyhow::ensure!(self.is_initialized(), "resize before initialize");
        anyhow::ensure!(!self.is_lost(), "resize after the surface was lost");
        anyhow::ensure!(
            !matches!(self.phase, Phase::Recording { .. }),
            "resize while a frame is being recorded"
        );

        if let Err(e) = self.drain() {
            self.phase = Phase::Degraded;
            return Err(e.context("failed to drain GPU work before resize"));
        }

        self.release_surface();
        self.extent = extent;

        if extent.is_empty() {
            log::debug!("surface released for zero-size extent");
            self.phase = Phase::Ready;
            return Ok(());
        }

        match self.build_surface(extent) {
            Ok(()) => {
                if self.phase == Phase::Degraded {
                    log::info!("renderer recovered");
                }
                self.phase = Phase::Ready;
                log::info!("surface recreated: {}x{}", extent.width, extent.height);
                Ok(())
            }
            Err(e) => {
                self.release_surface();
                self.phase = Phase::Degraded;
                Err(e.context("failed to recreate surface"))
            }
        }
    }

    /// Opens a frame on the current slot.
    ///
    /// Returns [`FrameStatus::Recording`] when the caller may run its draw
    /// callback and must follow up with [`end_frame`](Self::end_frame).
    pub fn begin_frame<U: UiLayer<B>>(&mut self, ui: &mut U) -> FrameStatus {
        match self.phase {
            Phase::Uninitialized => return FrameStatus::Skipped,
            Phase::Degraded => return FrameStatus::Degraded,
            Phase::Lost => return FrameStatus::Lost,
            Phase::Recording { slot } => {
                log::warn!("begin_frame called twice; slot {slot} is already recording");
                return FrameStatus::Recording;
            }
            Phase::Ready => {}
        }

        if self.slots.is_empty() {
            return FrameStatus::Skipped;
        }

        match self.record_begin(ui) {
            Ok(slot) => {
                self.phase = Phase::Recording { slot };
                FrameStatus::Recording
            }
            Err(e) => self.fail("begin_frame", e),
        }
    }

    /// Records UI, submits, presents and blocks until the GPU finished the frame.
    pub fn end_frame<U: UiLayer<B>>(&mut self, ui: &mut U) -> FrameStatus {
        let slot = match self.phase {
            Phase::Recording { slot } => slot,
            Phase::Degraded => return FrameStatus::Degraded,
            Phase::Lost => return FrameStatus::Lost,
            Phase::Uninitialized | Phase::Ready => return FrameStatus::Skipped,
        };

        match self.record_end(ui, slot) {
            Ok(()) => {
                self.phase = Phase::Ready;
                FrameStatus::Presented
            }
            Err(e) => self.fail("end_frame", e),
        }
    }

    /// Drains outstanding GPU work, then shuts the UI layer down and releases
    /// the surface. No-op when not initialized.
    pub fn finalize<U: UiLayer<B>>(&mut self, ui: &mut U) -> Result<()> {
        if !self.is_initialized() {
            return Ok(());
        }

        if let Phase::Recording { slot } = self.phase {
            log::warn!("finalizing with slot {slot} still recording; frame dropped");
        }

        let drained = self.drain();

        ui.shutdown();
        self.release_surface();
        self.phase = Phase::Uninitialized;

        log::info!("frame scheduler finalized at fence {}", self.fence.current());
        drained.context("failed to drain GPU work before teardown")
    }

    fn build_surface(&mut self, extent: Extent) -> Result<()> {
        self.backend
            .create_surface(extent, SLOTS)
            .context("failed to create surface")?;

        let slots = FrameSlot::create_ring(&mut self.backend, SLOTS)?;

        let open = self.backend.current_slot();
        anyhow::ensure!(open < SLOTS, "surface reported slot {open} of {SLOTS}");

        let recorder = self
            .backend
            .create_recorder(&slots[open].allocator)
            .context("failed to create command recorder")?;

        self.slots = slots;
        self.recorder = Some(recorder);
        self.open_slot = open;
        self.extent = extent;
        Ok(())
    }

    fn release_surface(&mut self) {
        self.recorder = None;
        self.slots.clear();
        self.backend.release_surface();
    }

    /// Signals a fresh fence value and waits for it.
    fn drain(&mut self) -> Result<()> {
        let value = self.fence.advance();
        self.backend.signal(value)?;
        self.backend.wait_for_fence(value)
    }

    fn record_begin<U: UiLayer<B>>(&mut self, ui: &mut U) -> Result<usize> {
        let slot = self.backend.current_slot();
        anyhow::ensure!(slot < self.slots.len(), "surface reported slot {slot} of {SLOTS}");

        if slot != self.open_slot {
            log::debug!("recorder open on slot {}, surface wants {slot}", self.open_slot);
            self.reopen_recorder(slot)?;
        }

        self.backend
            .acquire(slot)
            .with_context(|| format!("failed to acquire slot {slot}"))?;

        let recorder = self.recorder.as_mut().context("recorder is not open")?;
        let frame = &self.slots[slot];

        self.backend.barrier(
            recorder,
            &frame.image,
            ResourceState::Present,
            ResourceState::RenderTarget,
        )?;
        self.backend
            .clear(recorder, &frame.view, self.config.clear_color, self.extent)?;

        ui.new_frame();

        log::trace!("frame begun on slot {slot}");
        Ok(slot)
    }

    fn record_end<U: UiLayer<B>>(&mut self, ui: &mut U, slot: usize) -> Result<()> {
        let recorder = self.recorder.as_mut().context("recorder is not open")?;
        let frame = &self.slots[slot];

        self.backend.bind_render_target(recorder, &frame.view)?;
        ui.render(&mut self.backend, recorder, &frame.view)
            .context("failed to record UI")?;
        self.backend.barrier(
            recorder,
            &frame.image,
            ResourceState::RenderTarget,
            ResourceState::Present,
        )?;

        self.backend.submit(recorder).context("failed to submit")?;
        let value = self.fence.advance();
        self.backend.signal(value).context("failed to signal fence")?;
        self.slots[self.open_slot].fence_value = value;

        self.backend.present().context("failed to present")?;

        let next = self.backend.current_slot();
        self.backend
            .wait_for_fence(value)
            .with_context(|| format!("failed waiting for fence {value}"))?;

        self.reopen_recorder(next)?;

        log::trace!("frame presented from slot {slot} at fence {value}; next slot {next}");
        Ok(())
    }

    /// Resets `slot`'s allocator and reopens the recorder against it.
    ///
    /// The allocator is only touched once its last submission completed.
    fn reopen_recorder(&mut self, slot: usize) -> Result<()> {
        anyhow::ensure!(slot < self.slots.len(), "surface reported slot {slot} of {SLOTS}");

        let frame = &mut self.slots[slot];
        if self.backend.completed_value() < frame.fence_value {
            self.backend.wait_for_fence(frame.fence_value)?;
        }

        self.backend
            .reset_allocator(&mut frame.allocator)
            .with_context(|| format!("failed to reset allocator for slot {slot}"))?;

        let recorder = self.recorder.as_mut().context("recorder is not open")?;
        self.backend
            .reset_recorder(recorder, &frame.allocator)
            .context("failed to reopen recorder")?;

        self.open_slot = slot;
        Ok(())
    }

    /// Routes a steady-state failure by the backend's classification of it.
    ///
    /// Only acquire failures carry one: a retryable acquire skips the frame
    /// and a fatal one loses the surface. Everything else degrades.
    fn fail(&mut self, step: &str, err: anyhow::Error) -> FrameStatus {
        let recovery = err.downcast_ref::<AcquireError>().map(|e| e.recovery);

        match recovery {
            Some(SurfaceRecovery::Retry) => {
                log::warn!("{step}: {err:#}; frame skipped");
                FrameStatus::Skipped
            }
            Some(SurfaceRecovery::Fatal) => {
                log::error!("{step} failed: {err:#}");
                log::error!("surface lost; rendering stopped");
                self.phase = Phase::Lost;
                FrameStatus::Lost
            }
            Some(SurfaceRecovery::Reconfigured) | None => self.degrade(step, err),
        }
    }

    fn degrade(&mut self, step: &str, err: anyhow::Error) -> FrameStatus {
        log::error!("{step} failed: {err:#}");
        if self.phase != Phase::Degraded {
            log::warn!("renderer degraded; frames are skipped until the surface is rebuilt");
        }
        self.phase = Phase::Degraded;
        FrameStatus::Degraded
    }
}
