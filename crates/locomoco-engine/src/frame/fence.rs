/// Monotonic fence value generator.
///
/// Every submission takes a fresh value from [`advance`](Self::advance). Values
/// are never reused or decremented.
#[derive(Debug, Default, Clone)]
pub struct FenceCounter {
    value: u64,
}

impl FenceCounter {
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Last value handed out; `0` before the first submission.
    #[inline]
    pub fn current(&self) -> u64 {
        self.value
    }

    /// Issues the next value.
    #[inline]
    pub fn advance(&mut self) -> u64 {
        self.value += 1;
        self.value
    }
}
