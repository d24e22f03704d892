use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use winit::window::Window;

use crate::frame::{AcquireError, ClearColor, Extent, GpuBackend, ResourceState, SurfaceRecovery};

use super::{surface, GpuInit};

/// Per-slot command memory.
///
/// wgpu allocates command memory per encoder, so this only tracks which slot
/// an encoder belongs to.
#[derive(Debug)]
pub struct WgpuAllocator {
    slot: usize,
}

/// Frame command recorder.
///
/// Holds an open encoder between `reset_recorder` and `submit`.
#[derive(Debug)]
pub struct WgpuRecorder {
    slot: usize,
    encoder: Option<wgpu::CommandEncoder>,
}

impl WgpuRecorder {
    /// Slot whose allocator the recorder is open against.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Open encoder, for UI layers recording their own passes.
    pub fn encoder_mut(&mut self) -> Result<&mut wgpu::CommandEncoder> {
        self.encoder.as_mut().context("recorder is closed")
    }
}

/// Handle to a surface slot image.
///
/// The texture itself is only reachable between `acquire` and `present`.
#[derive(Debug)]
pub struct SlotImage {
    slot: usize,
}

/// Handle to a slot's render-target view.
#[derive(Debug)]
pub struct SlotView {
    slot: usize,
}

struct Acquired {
    slot: usize,
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    state: ResourceState,
}

/// wgpu implementation of [`GpuBackend`].
///
/// - the surface is configured with the scheduler's slot count as frame latency
/// - the current slot is derived from the number of frames presented since the
///   surface was configured
/// - resource barriers are validated against the tracked image state; wgpu
///   inserts the actual transitions itself
/// - the fence is a completed-value counter bumped from
///   `Queue::on_submitted_work_done`, waited on with `Device::poll`
pub struct WgpuBackend<'w> {
    /// Surface bound to the window.
    ///
    /// The window must outlive the backend.
    surface: wgpu::Surface<'w>,

    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Surface configuration; width/height follow the last `create_surface`.
    config: wgpu::SurfaceConfiguration,
    configured: bool,

    slot_count: usize,
    presented: u64,
    acquired: Option<Acquired>,

    completed: Arc<AtomicU64>,
    last_submission: Option<wgpu::SubmissionIndex>,
}

impl<'w> WgpuBackend<'w> {
    /// Acquires an adapter, device and queue for `window`.
    ///
    /// The surface is created here but configured by the frame scheduler.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let GpuInit {
            backends,
            power_preference,
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("locomoco device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps.formats, prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps.alpha_modes, alpha_mode);

        log::info!(
            "GPU ready: {} ({:?}), surface format {format:?}",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            configured: false,
            slot_count: 0,
            presented: 0,
            acquired: None,
            completed: Arc::new(AtomicU64::new(0)),
            last_submission: None,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Size of the configured surface; empty while released.
    pub fn surface_extent(&self) -> Extent {
        if !self.configured {
            return Extent::new(0, 0);
        }
        Extent::new(self.config.width, self.config.height)
    }

    /// Texture view behind `view`, valid while its slot is acquired.
    pub fn target_view(&self, view: &SlotView) -> Result<&wgpu::TextureView> {
        Ok(&self.acquired_for(view.slot)?.view)
    }

    fn acquired_for(&self, slot: usize) -> Result<&Acquired> {
        match &self.acquired {
            Some(a) if a.slot == slot => Ok(a),
            Some(a) => bail!("slot {slot} is not acquired (slot {} is)", a.slot),
            None => bail!("slot {slot} is not acquired"),
        }
    }

    fn new_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("locomoco frame encoder"),
            })
    }
}

impl<'w> GpuBackend for WgpuBackend<'w> {
    type Allocator = WgpuAllocator;
    type Recorder = WgpuRecorder;
    type Image = SlotImage;
    type View = SlotView;

    fn create_surface(&mut self, extent: Extent, slot_count: usize) -> Result<()> {
        anyhow::ensure!(!extent.is_empty(), "cannot configure a zero-size surface");
        anyhow::ensure!(slot_count > 0, "surface needs at least one image");

        self.config.width = extent.width;
        self.config.height = extent.height;
        self.config.desired_maximum_frame_latency = slot_count as u32;
        self.surface.configure(&self.device, &self.config);

        self.configured = true;
        self.slot_count = slot_count;
        self.presented = 0;
        Ok(())
    }

    fn release_surface(&mut self) {
        // Dropping an unpresented texture hands it back to the surface.
        self.acquired = None;
        self.configured = false;
    }

    fn create_allocator(&mut self, slot: usize) -> Result<WgpuAllocator> {
        anyhow::ensure!(slot < self.slot_count, "slot {slot} out of range");
        Ok(WgpuAllocator { slot })
    }

    fn slot_image(&mut self, slot: usize) -> Result<SlotImage> {
        anyhow::ensure!(self.configured, "surface is not configured");
        anyhow::ensure!(slot < self.slot_count, "slot {slot} out of range");
        Ok(SlotImage { slot })
    }

    fn create_view(&mut self, image: &SlotImage, slot: usize) -> Result<SlotView> {
        anyhow::ensure!(image.slot == slot, "image of slot {} used for slot {slot}", image.slot);
        Ok(SlotView { slot })
    }

    fn create_recorder(&mut self, allocator: &WgpuAllocator) -> Result<WgpuRecorder> {
        Ok(WgpuRecorder {
            slot: allocator.slot,
            encoder: Some(self.new_encoder()),
        })
    }

    fn current_slot(&self) -> usize {
        if self.slot_count == 0 {
            return 0;
        }
        (self.presented % self.slot_count as u64) as usize
    }

    fn acquire(&mut self, slot: usize) -> Result<()> {
        anyhow::ensure!(self.configured, "surface is not configured");
        anyhow::ensure!(self.acquired.is_none(), "a slot is already acquired");

        let texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(source) => {
                let recovery = surface::surface_recovery(&source);
                if recovery == SurfaceRecovery::Reconfigured {
                    self.surface.configure(&self.device, &self.config);
                }
                return Err(AcquireError::new(slot, recovery, source).into());
            }
        };

        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.acquired = Some(Acquired {
            slot,
            texture,
            view,
            state: ResourceState::Present,
        });
        Ok(())
    }

    fn barrier(
        &mut self,
        recorder: &mut WgpuRecorder,
        image: &SlotImage,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()> {
        recorder.encoder_mut()?;

        let acquired = match &mut self.acquired {
            Some(a) if a.slot == image.slot => a,
            _ => bail!("barrier on slot {} which is not acquired", image.slot),
        };
        anyhow::ensure!(
            acquired.state == before,
            "slot {} is {:?}, barrier expected {before:?}",
            image.slot,
            acquired.state
        );

        acquired.state = after;
        Ok(())
    }

    fn clear(
        &mut self,
        recorder: &mut WgpuRecorder,
        view: &SlotView,
        color: ClearColor,
        _extent: Extent,
    ) -> Result<()> {
        let target = &self.acquired_for(view.slot)?.view;
        let encoder = recorder.encoder_mut()?;

        // A clear load op covers the whole attachment, which is the full extent.
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("locomoco clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: color.r as f64,
                        g: color.g as f64,
                        b: color.b as f64,
                        a: color.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    fn bind_render_target(&mut self, recorder: &mut WgpuRecorder, view: &SlotView) -> Result<()> {
        recorder.encoder_mut()?;
        let acquired = self.acquired_for(view.slot)?;
        anyhow::ensure!(
            acquired.state == ResourceState::RenderTarget,
            "slot {} bound as render target while {:?}",
            view.slot,
            acquired.state
        );
        Ok(())
    }

    fn submit(&mut self, recorder: &mut WgpuRecorder) -> Result<()> {
        let encoder = recorder.encoder.take().context("recorder is closed")?;
        let index = self.queue.submit(std::iter::once(encoder.finish()));
        self.last_submission = Some(index);
        Ok(())
    }

    fn signal(&mut self, value: u64) -> Result<()> {
        let completed = Arc::clone(&self.completed);
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let acquired = self.acquired.take().context("no acquired slot to present")?;
        anyhow::ensure!(
            acquired.state == ResourceState::Present,
            "slot {} presented while {:?}",
            acquired.slot,
            acquired.state
        );

        drop(acquired.view);
        acquired.texture.present();
        self.presented += 1;
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn wait_for_fence(&mut self, value: u64) -> Result<()> {
        if self.completed_value() >= value {
            return Ok(());
        }

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: self.last_submission.clone(),
                timeout: None,
            })
            .context("device poll failed")?;

        // Signals issued without a new submission complete with the queue.
        if self.completed_value() < value {
            self.device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: None,
                })
                .context("device poll failed")?;
        }

        let completed = self.completed_value();
        anyhow::ensure!(
            completed >= value,
            "fence stuck at {completed} after device idle, expected {value}"
        );
        Ok(())
    }

    fn reset_allocator(&mut self, allocator: &mut WgpuAllocator) -> Result<()> {
        anyhow::ensure!(allocator.slot < self.slot_count, "slot {} out of range", allocator.slot);
        Ok(())
    }

    fn reset_recorder(
        &mut self,
        recorder: &mut WgpuRecorder,
        allocator: &WgpuAllocator,
    ) -> Result<()> {
        // Dropping an unsubmitted encoder discards what it recorded.
        recorder.encoder = Some(self.new_encoder());
        recorder.slot = allocator.slot;
        Ok(())
    }
}
