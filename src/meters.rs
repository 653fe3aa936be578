//! Thread-safe metering for real-time audio processing.
//!
//! Atomic float storage shares level data between the audio thread and
//! the observer thread without locks; the three fields are independent
//! single-writer scalars, so relaxed ordering is all they need. The
//! windowed RMS accumulator lives on the audio thread only and publishes
//! into [`Meters`] once per accumulation window.

use std::sync::atomic::{AtomicU32, Ordering};

/// Sample-channel products accumulated before a level snapshot is published.
pub const LEVEL_WINDOW: usize = 2048;

/// Linear RMS floor (-80 dB) below which gain change reads as 0 dB.
pub const RMS_FLOOR: f32 = 1e-4;

const LEVEL_DB_FLOOR: f32 = -100.0;

#[derive(Default)]
pub struct Meters {
    input_rms: AtomicU32,
    output_rms: AtomicU32,
    gain_change_db: AtomicU32,
}

impl Meters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_rms(&self, val: f32) {
        self.input_rms.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn set_output_rms(&self, val: f32) {
        self.output_rms.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn set_gain_change_db(&self, val: f32) {
        self.gain_change_db.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn input_rms(&self) -> f32 {
        f32::from_bits(self.input_rms.load(Ordering::Relaxed))
    }

    pub fn output_rms(&self) -> f32 {
        f32::from_bits(self.output_rms.load(Ordering::Relaxed))
    }

    pub fn input_level_db(&self) -> f32 {
        linear_to_db(self.input_rms())
    }

    pub fn output_level_db(&self) -> f32 {
        linear_to_db(self.output_rms())
    }

    pub fn gain_change_db(&self) -> f32 {
        f32::from_bits(self.gain_change_db.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.set_input_rms(0.0);
        self.set_output_rms(0.0);
        self.set_gain_change_db(0.0);
    }
}

#[inline]
fn linear_to_db(linear: f32) -> f32 {
    if linear <= 1e-5 {
        LEVEL_DB_FLOOR
    } else {
        20.0 * linear.log10()
    }
}

/// Running squared sums over one accumulation window.
#[derive(Debug, Default, Clone, Copy)]
pub struct RmsAccumulator {
    input_sq_sum: f32,
    output_sq_sum: f32,
    count: usize,
}

impl RmsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates one input/output sample pair (one sample-channel product).
    #[inline]
    pub fn accumulate(&mut self, input: f32, output: f32) {
        self.input_sq_sum += input * input;
        self.output_sq_sum += output * output;
        self.count += 1;
    }

    /// Publishes a snapshot and restarts the window once enough
    /// sample-channel products have been seen. RMS is taken over the
    /// actual accumulated count, which can overshoot the window by up to
    /// one block.
    pub fn publish_if_ready(&mut self, meters: &Meters) {
        if self.count < LEVEL_WINDOW {
            return;
        }

        let n = self.count as f32;
        let input_rms = (self.input_sq_sum / n).sqrt();
        let output_rms = (self.output_sq_sum / n).sqrt();

        meters.set_input_rms(input_rms);
        meters.set_output_rms(output_rms);

        if input_rms > RMS_FLOOR && output_rms > RMS_FLOOR {
            meters.set_gain_change_db(20.0 * (output_rms / input_rms).log10());
        } else {
            meters.set_gain_change_db(0.0);
        }

        self.reset();
    }

    pub fn reset(&mut self) {
        self.input_sq_sum = 0.0;
        self.output_sq_sum = 0.0;
        self.count = 0;
    }
}
