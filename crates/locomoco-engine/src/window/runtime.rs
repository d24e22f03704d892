use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorIcon, Window, WindowId};

use crate::core::App;
use crate::device::{GpuInit, WgpuBackend};
use crate::frame::{FrameStatus, SchedulerConfig, UiLayer};
use crate::queue::MessageSender;
use crate::state::{InitParams, Message};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,

    /// Client-area size in physical pixels.
    pub initial_size: PhysicalSize<u32>,

    /// Cursor shown over the client area.
    pub cursor: CursorIcon,

    pub scheduler: SchedulerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "locomoco".to_string(),
            initial_size: PhysicalSize::new(1920, 1080),
            cursor: CursorIcon::Default,
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// State available at the event-translation boundary.
///
/// Window callbacks only ever push messages; they never touch app state.
#[derive(Debug, Clone)]
pub struct EventContext {
    sender: MessageSender<Message>,
    cursor: CursorIcon,
}

impl EventContext {
    pub fn new(sender: MessageSender<Message>, cursor: CursorIcon) -> Self {
        Self { sender, cursor }
    }

    /// Forwards `event` to the app as a message, if it maps to one.
    pub fn handle(&self, window: &Window, event: &WindowEvent) {
        if let WindowEvent::CursorEntered { .. } = event {
            window.set_cursor(self.cursor);
        }

        if let Some(message) = translate_window_event(event) {
            log::debug!("queued {message:?}");
            self.sender.send(message);
        }
    }
}

/// Maps a platform window event to an app message.
pub fn translate_window_event(event: &WindowEvent) -> Option<Message> {
    match event {
        WindowEvent::Resized(size) => Some(Message::Resize {
            width: size.width,
            height: size.height,
        }),

        WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
            Some(Message::ScaleFactorChanged {
                scale: *scale_factor,
            })
        }

        WindowEvent::KeyboardInput { event, .. }
            if event.state == ElementState::Pressed
                && !event.repeat
                && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
        {
            Some(Message::RequestExit)
        }

        _ => None,
    }
}

type BoxedUi<'w> = Box<dyn UiLayer<WgpuBackend<'w>>>;
type WindowApp<'w> = App<WgpuBackend<'w>, BoxedUi<'w>>;

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the main window and runs the frame loop until exit.
    ///
    /// GPU initialization failures end the loop and are returned.
    pub fn run<U>(config: RuntimeConfig, gpu_init: GpuInit, ui: U) -> Result<()>
    where
        U: for<'w> UiLayer<WgpuBackend<'w>> + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut handler = Handler::new(config, gpu_init, ui);

        event_loop
            .run_app(&mut handler)
            .context("winit event loop terminated with error")?;

        match handler.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[not_covariant]
    app: WindowApp<'this>,
}

struct Handler<U> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    ui: Option<U>,

    entry: Option<WindowEntry>,
    events: Option<EventContext>,

    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<U> Handler<U>
where
    U: for<'w> UiLayer<WgpuBackend<'w>> + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, ui: U) -> Self {
        Self {
            config,
            gpu_init,
            ui: Some(ui),
            entry: None,
            events: None,
            exit_requested: false,
            error: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        window.set_cursor(self.config.cursor);

        let ui = self.ui.take().context("main window was already created")?;
        let gpu_init = self.gpu_init.clone();
        let scheduler = self.config.scheduler.clone();

        let entry = WindowEntryTryBuilder {
            window,
            app_builder: |window| {
                let size = window.inner_size();
                let backend = pollster::block_on(WgpuBackend::new(window, gpu_init))
                    .context("failed to initialize GPU")?;
                let ui: BoxedUi<'_> = Box::new(ui);

                App::with_config(
                    backend,
                    ui,
                    InitParams {
                        width: size.width,
                        height: size.height,
                    },
                    scheduler,
                )
            },
        }
        .try_build()?;

        let sender = entry.with_app(|app| app.sender());
        let scale = entry.with_window(|w| w.scale_factor());
        sender.send(Message::ScaleFactorChanged { scale });
        self.events = Some(EventContext::new(sender, self.config.cursor));
        self.entry = Some(entry);
        Ok(())
    }

    /// Drains the GPU, tears the window down and leaves the loop.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut entry) = self.entry.take() {
            entry.with_app_mut(|app| {
                if let Err(e) = app.finalize() {
                    log::error!("{e:#}");
                }
            });
        }

        self.events = None;
        self.exit_requested = true;
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let mut exit = false;
        let mut lost = false;
        entry.with_mut(|fields| {
            fields.app.update();
            if fields.app.frame_state().exit_requested {
                exit = true;
                return;
            }

            fields.window.pre_present_notify();
            if fields.app.draw(|ui| ui.draw()) == FrameStatus::Lost {
                lost = true;
            }
        });

        if lost {
            self.error = Some(anyhow!("GPU surface lost; shutting down"));
            self.shutdown(event_loop);
        } else if exit {
            log::info!("exit requested");
            self.shutdown(event_loop);
        }
    }
}

impl<U> ApplicationHandler for Handler<U>
where
    U: for<'w> UiLayer<WgpuBackend<'w>> + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to start: {e:#}");
            self.error = Some(e);
            self.exit_requested = true;
            event_loop.exit();
            return;
        }

        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Idle ticks: keep redrawing continuously.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if let (Some(entry), Some(events)) = (&self.entry, &self.events) {
            entry.with_window(|w| events.handle(w, &event));
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = &self.entry {
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
