use anyhow::Result;

use locomoco_engine::device::{SlotView, WgpuBackend, WgpuRecorder};
use locomoco_engine::frame::{Extent, UiLayer};
use locomoco_engine::time::FrameClock;

/// Frame time at which the meter spans the full window width.
const METER_FULL_SCALE_MS: f32 = 1000.0 / 30.0;
/// Meter height in logical pixels.
const METER_HEIGHT: f64 = 6.0;

/// Status overlay: logs the frame rate and draws a frame-time meter along the
/// top edge of the window.
pub struct StatusLayer {
    clock: FrameClock,
    mean_ms: f32,
    scale: f64,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
}

impl StatusLayer {
    pub fn new() -> Self {
        Self {
            clock: FrameClock::default(),
            mean_ms: 0.0,
            scale: 1.0,
            pipeline_format: None,
            pipeline: None,
        }
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("locomoco meter shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/meter.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("locomoco meter pipeline"),
            layout: None,

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
    }
}

impl Default for StatusLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<'w> UiLayer<WgpuBackend<'w>> for StatusLayer {
    fn new_frame(&mut self) {
        let (_, rate) = self.clock.tick();
        if let Some(rate) = rate {
            log::info!(
                "{:.1} fps ({:.2} ms/frame over {} frames)",
                rate.fps,
                rate.mean_ms,
                rate.frames
            );
            self.mean_ms = rate.mean_ms;
        }
    }

    fn scale_factor_changed(&mut self, scale: f64) {
        log::debug!("status meter scale {scale}");
        self.scale = scale;
    }

    fn render(
        &mut self,
        backend: &mut WgpuBackend<'w>,
        recorder: &mut WgpuRecorder,
        view: &SlotView,
    ) -> Result<()> {
        let extent = backend.surface_extent();
        let Some((width, height)) = meter_size(self.mean_ms, self.scale, extent) else {
            return Ok(());
        };

        self.ensure_pipeline(backend.device(), backend.surface_format());
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Ok(());
        };

        let target = backend.target_view(view)?;
        let encoder = recorder.encoder_mut()?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("locomoco meter pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_scissor_rect(0, 0, width, height);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.pipeline = None;
        self.pipeline_format = None;
    }
}

/// Meter bar size in physical pixels, or `None` when there is nothing to draw.
fn meter_size(mean_ms: f32, scale: f64, extent: Extent) -> Option<(u32, u32)> {
    if extent.is_empty() || mean_ms <= 0.0 {
        return None;
    }

    let fraction = (mean_ms / METER_FULL_SCALE_MS).clamp(0.0, 1.0);
    let width = ((extent.width as f32 * fraction).round() as u32).min(extent.width);
    let height = ((METER_HEIGHT * scale).round().max(1.0) as u32).min(extent.height);

    if width == 0 {
        return None;
    }
    Some((width, height))
}
