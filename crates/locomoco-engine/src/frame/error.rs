use std::fmt;

/// How the frame loop can get past a failed surface acquisition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceRecovery {
    /// The surface went stale and was reconfigured; the slot ring is rebuilt.
    Reconfigured,
    /// Nothing is wrong with the surface; a later frame may succeed.
    Retry,
    /// Out of memory. Rebuilding will not help.
    Fatal,
}

/// Failed acquisition of a slot image, classified by the backend.
///
/// Travels inside `anyhow::Error`; the scheduler downcasts to it to decide
/// between skipping the frame, rebuilding the surface and giving up.
#[derive(Debug)]
pub struct AcquireError {
    pub slot: usize,
    pub recovery: SurfaceRecovery,
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl AcquireError {
    pub fn new<E>(slot: usize, recovery: SurfaceRecovery, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            slot,
            recovery,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to acquire surface image for slot {}: {} ({:?})",
            self.slot, self.source, self.recovery
        )
    }
}

impl std::error::Error for AcquireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}
