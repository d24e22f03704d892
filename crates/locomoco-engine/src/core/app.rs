use std::sync::Arc;

use anyhow::{Context, Result};

use crate::frame::{FrameScheduler, FrameStatus, GpuBackend, SchedulerConfig, UiLayer};
use crate::queue::{MessageQueue, MessageSender};
use crate::state::{AppState, FrameState, InitParams, Message};

/// Per-tick orchestrator.
///
/// Owns the durable and per-frame state, the inbound message queue and the
/// frame scheduler. Must be driven from a single thread; producers on other
/// threads talk to it through [`MessageSender`].
pub struct App<B, U, const SLOTS: usize = 2>
where
    B: GpuBackend,
    U: UiLayer<B>,
{
    queue: Arc<MessageQueue<Message>>,

    /// Stable over frames.
    state: AppState,

    /// Cleared every tick.
    frame_state: FrameState,

    scheduler: FrameScheduler<B, SLOTS>,
    ui: U,
}

impl<B, U, const SLOTS: usize> App<B, U, SLOTS>
where
    B: GpuBackend,
    U: UiLayer<B>,
{
    /// Brings up the frame scheduler with default configuration.
    ///
    /// Failure is fatal; the backend and UI are dropped.
    pub fn initialize(backend: B, ui: U, params: InitParams) -> Result<Self> {
        Self::with_config(backend, ui, params, SchedulerConfig::default())
    }

    pub fn with_config(
        backend: B,
        ui: U,
        params: InitParams,
        config: SchedulerConfig,
    ) -> Result<Self> {
        let state = AppState::new(params);

        let mut scheduler = FrameScheduler::new(backend, config);
        scheduler
            .initialize(state.extent())
            .context("failed to initialize renderer")?;

        Ok(Self {
            queue: Arc::new(MessageQueue::new()),
            state,
            frame_state: FrameState::default(),
            scheduler,
            ui,
        })
    }

    /// Returns a producer handle usable from any thread.
    pub fn sender(&self) -> MessageSender<Message> {
        MessageSender::new(Arc::clone(&self.queue))
    }

    pub fn push_message(&self, message: Message) {
        self.queue.push(message);
    }

    /// CPU half of a tick: clears the frame state, applies every pending
    /// message in arrival order and tells the UI layer about scale changes.
    ///
    /// Returns the number of messages applied.
    pub fn update(&mut self) -> usize {
        self.frame_state.clear();

        let (state, frame) = (&mut self.state, &mut self.frame_state);
        let applied = self.queue.drain(|message| {
            log::trace!("applying {message:?}");
            message.apply(state, frame);
        });

        if applied > 0 {
            log::debug!("applied {applied} messages (revision {})", self.state.revision);
        }

        if self.frame_state.scale_dirty {
            self.ui.scale_factor_changed(self.state.scale_factor);
        }
        applied
    }

    /// GPU half of a tick.
    ///
    /// Recreates the surface if this tick resized it, then runs `draw` between
    /// `begin_frame` and `end_frame`. `draw` is not called when the frame is
    /// skipped.
    pub fn draw<F>(&mut self, draw: F) -> FrameStatus
    where
        F: FnOnce(&mut U),
    {
        if !self.scheduler.is_initialized() {
            return FrameStatus::Skipped;
        }

        if let Err(e) = self.scheduler.sync_surface(&self.state, &self.frame_state) {
            log::error!("{e:#}");
        }

        match self.scheduler.begin_frame(&mut self.ui) {
            FrameStatus::Recording => {}
            other => return other,
        }

        draw(&mut self.ui);

        self.scheduler.end_frame(&mut self.ui)
    }

    /// `update` followed by `draw`.
    pub fn tick<F>(&mut self, draw: F) -> FrameStatus
    where
        F: FnOnce(&mut U),
    {
        self.update();
        self.draw(draw)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn frame_state(&self) -> &FrameState {
        &self.frame_state
    }

    pub fn scheduler(&self) -> &FrameScheduler<B, SLOTS> {
        &self.scheduler
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn is_initialized(&self) -> bool {
        self.scheduler.is_initialized()
    }

    /// Waits for the GPU to go idle, then tears down UI and surface resources.
    ///
    /// Idempotent. Also run on drop.
    pub fn finalize(&mut self) -> Result<()> {
        self.scheduler.finalize(&mut self.ui)
    }
}

impl<B, U, const SLOTS: usize> Drop for App<B, U, SLOTS>
where
    B: GpuBackend,
    U: UiLayer<B>,
{
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            log::error!("finalize on drop failed: {e:#}");
        }
    }
}
