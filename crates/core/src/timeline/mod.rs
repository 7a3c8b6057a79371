/// Engine-local time built from per-frame deltas.
///
/// Engines never read the wall clock; the dispatcher advances one of these
/// per frame and hands the resulting timestamp down.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    pub time_ms: f64,
    pub frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.time_ms = 0.0;
        self.frames = 0;
    }

    /// Adds one frame of `delta_ms` and returns the new timestamp.
    pub fn advance(&mut self, delta_ms: f32) -> f64 {
        let delta = if delta_ms.is_finite() {
            delta_ms.max(0.0)
        } else {
            0.0
        };
        self.time_ms += delta as f64;
        self.frames += 1;
        self.time_ms
    }
}

/// A timer that runs for a fixed span once triggered and refuses retriggers
/// until that span has elapsed.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OneShot {
    started_ms: Option<f64>,
}

impl OneShot {
    /// Starts the timer unless it is already running. Returns true if started.
    pub fn trigger(&mut self, now_ms: f64, duration_ms: f32) -> bool {
        if self.is_running(now_ms, duration_ms) {
            return false;
        }
        self.started_ms = Some(now_ms);
        true
    }

    pub fn is_running(&self, now_ms: f64, duration_ms: f32) -> bool {
        self.started_ms
            .map(|start| now_ms - start < duration_ms as f64)
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.started_ms = None;
    }
}
