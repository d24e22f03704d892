use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time since the previous tick, in seconds. Clamped to `max_dt`.
    pub dt: f32,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame rate averaged over one reporting interval.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameRate {
    pub frames: u32,
    pub fps: f32,
    /// Mean frame time in milliseconds.
    pub mean_ms: f32,
}

/// Per-loop frame clock.
///
/// `tick` once per presented frame. Every `report_interval` the clock yields a
/// [`FrameRate`] averaged over that interval.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    max_dt: Duration,

    report_interval: Duration,
    window_start: Instant,
    window_frames: u32,
}

impl FrameClock {
    pub fn new(report_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            last: now,
            frame_index: 0,
            max_dt: Duration::from_millis(250),
            report_interval,
            window_start: now,
            window_frames: 0,
        }
    }

    /// Advances the clock at `now`.
    pub fn tick_at(&mut self, now: Instant) -> (FrameTime, Option<FrameRate>) {
        let dt = now.saturating_duration_since(self.last).min(self.max_dt);
        self.last = now;

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        self.window_frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.report_interval {
            return (time, None);
        }

        let secs = elapsed.as_secs_f32();
        let rate = FrameRate {
            frames: self.window_frames,
            fps: self.window_frames as f32 / secs,
            mean_ms: secs * 1000.0 / self.window_frames as f32,
        };
        self.window_start = now;
        self.window_frames = 0;

        (time, Some(rate))
    }

    pub fn tick(&mut self) -> (FrameTime, Option<FrameRate>) {
        self.tick_at(Instant::now())
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
