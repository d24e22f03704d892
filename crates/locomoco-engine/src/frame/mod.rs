//! Frame scheduling and CPU/GPU synchronization.
//!
//! The scheduler is backend-agnostic: it drives any [`GpuBackend`] through a
//! fixed ring of per-image slots and a single monotonically increasing fence.
//! `device::WgpuBackend` is the production implementation.

mod backend;
mod error;
mod fence;
mod scheduler;
mod slot;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{GpuBackend, NoUi, UiLayer};
pub use error::{AcquireError, SurfaceRecovery};
pub use fence::FenceCounter;
pub use scheduler::{FrameScheduler, SchedulerConfig};
pub use slot::FrameSlot;
pub use types::{ClearColor, Extent, FrameStatus, ResourceState};
