use std::time::Duration;

use crate::params::CloudParams;

/// Seam for an interactive parameter editor.
///
/// Called once per frame after input routing and before the matrices are
/// refreshed. `hint` describes what the capture toggle currently does.
pub trait ParamEditor {
    fn frame(&mut self, params: &mut CloudParams, hint: &str);
}

/// Editor that leaves the parameters untouched.
#[derive(Debug, Default)]
pub struct NoEditor;

impl ParamEditor for NoEditor {
    fn frame(&mut self, _params: &mut CloudParams, _hint: &str) {}
}

/// Averaged frame timing for one reporting window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameReport {
    pub frames: u32,
    pub avg_ms: f32,
    pub fps: f32,
}

/// Accumulates frame times and yields a report once per interval.
#[derive(Debug, Clone)]
pub struct FrameStats {
    interval: Duration,
    accumulated: Duration,
    frames: u32,
}

impl FrameStats {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
            frames: 0,
        }
    }

    /// Records one frame of length `dt`.
    pub fn record(&mut self, dt: Duration) -> Option<FrameReport> {
        self.accumulated += dt;
        self.frames += 1;

        if self.accumulated < self.interval || self.accumulated.is_zero() {
            return None;
        }

        let secs = self.accumulated.as_secs_f32();
        let report = FrameReport {
            frames: self.frames,
            avg_ms: secs * 1000.0 / self.frames as f32,
            fps: self.frames as f32 / secs,
        };

        self.accumulated = Duration::ZERO;
        self.frames = 0;
        Some(report)
    }
}
