//! wgpu device + surface backend.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - configuring the Surface (swapchain) for the frame scheduler's slot ring
//! - implementing `frame::GpuBackend` on top of wgpu encoders, submissions and
//!   device polling

mod gpu;
mod init;
mod surface;

pub use gpu::{SlotImage, SlotView, WgpuAllocator, WgpuBackend, WgpuRecorder};
pub use init::GpuInit;
