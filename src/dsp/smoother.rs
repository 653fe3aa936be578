//! Linear parameter smoothing.
//!
//! Turns discrete per-block target values into per-sample interpolated
//! values so coefficient changes never step audibly. One instance per
//! smoothed parameter, owned by the processing loop; this is a pure
//! numeric transform with no thread-safety of its own.

#[derive(Debug, Clone, Copy)]
pub struct LinearSmoother {
    current: f32,
    target: f32,
    step: f32,
    steps_remaining: u32,
    steps_per_ramp: u32,
}

impl Default for LinearSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSmoother {
    pub fn new() -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            step: 0.0,
            steps_remaining: 0,
            steps_per_ramp: 0,
        }
    }

    /// Reinitializes ramp granularity for a sample rate. Snaps the
    /// current value onto the target and cancels any ramp in flight.
    pub fn reset(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.steps_per_ramp = (ramp_seconds * sample_rate).floor().max(1.0) as u32;
        self.current = self.target;
        self.step = 0.0;
        self.steps_remaining = 0;
    }

    /// Jumps both current and target to `value` with no ramp.
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.steps_remaining = 0;
    }

    /// Updates the destination without a discontinuity: the ramp restarts
    /// from wherever the current value happens to be.
    pub fn set_target(&mut self, value: f32) {
        if value == self.target {
            return;
        }
        if self.steps_per_ramp == 0 {
            self.set_current_and_target(value);
            return;
        }
        self.target = value;
        self.steps_remaining = self.steps_per_ramp;
        self.step = (value - self.current) / self.steps_per_ramp as f32;
    }

    /// Advances one sample and returns the new current value.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.steps_remaining == 0 {
            self.current = self.target;
            return self.current;
        }
        self.steps_remaining -= 1;
        if self.steps_remaining == 0 {
            // Land exactly on the target, no float drift
            self.current = self.target;
        } else {
            self.current += self.step;
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[allow(dead_code)]
    pub fn is_smoothing(&self) -> bool {
        self.steps_remaining > 0
    }
}
