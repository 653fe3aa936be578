//! Published coefficients and frequency-response estimation.
//!
//! The audio thread publishes each freshly synthesized coefficient set
//! into a double-buffered store: it writes the spare slot under a
//! `try_lock` and flips an atomic index, so a publish can never block the
//! signal path. The observer snapshots the active slot under a short
//! lock and evaluates the 512-bin magnitude response entirely outside
//! it.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::dsp::CoefficientSet;

pub const RESPONSE_BINS: usize = 512;

const RESPONSE_MIN_HZ: f32 = 20.0;
/// 20 Hz * 1000 = 20 kHz: three decades of log-spaced bins.
const RESPONSE_SPAN: f32 = 1000.0;

/// Magnitude floor, -100 dB; keeps log10 off zero.
const MAGNITUDE_FLOOR: f32 = 1e-5;

static BIN_FREQUENCIES: Lazy<[f32; RESPONSE_BINS]> = Lazy::new(|| {
    let mut freqs = [0.0; RESPONSE_BINS];
    for (i, f) in freqs.iter_mut().enumerate() {
        *f = RESPONSE_MIN_HZ * RESPONSE_SPAN.powf(i as f32 / (RESPONSE_BINS - 1) as f32);
    }
    freqs
});

/// The log-spaced frequency grid the estimator evaluates, 20 Hz-20 kHz.
pub fn bin_frequencies() -> &'static [f32; RESPONSE_BINS] {
    &BIN_FREQUENCIES
}

pub struct CoefficientStore {
    slots: [Mutex<CoefficientSet>; 2],
    active_slot: AtomicUsize,
    sample_rate: AtomicU32,
}

impl Default for CoefficientStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CoefficientStore {
    pub fn new() -> Self {
        Self {
            slots: [
                Mutex::new(CoefficientSet::empty()),
                Mutex::new(CoefficientSet::empty()),
            ],
            active_slot: AtomicUsize::new(0),
            sample_rate: AtomicU32::new(0.0_f32.to_bits()),
        }
    }

    pub fn set_sample_rate(&self, sample_rate: f32) {
        self.sample_rate
            .store(sample_rate.to_bits(), Ordering::Relaxed);
    }

    pub fn sample_rate(&self) -> f32 {
        f32::from_bits(self.sample_rate.load(Ordering::Relaxed))
    }

    /// Publishes a new snapshot from the audio thread. Returns false if
    /// the spare slot was held by a reader; the caller simply publishes
    /// again on the next resynthesis.
    pub fn publish(&self, set: &CoefficientSet) -> bool {
        let spare = 1 - self.active_slot.load(Ordering::Relaxed);
        let Ok(mut slot) = self.slots[spare].try_lock() else {
            return false;
        };
        *slot = *set;
        drop(slot);
        self.active_slot.store(spare, Ordering::Release);
        true
    }

    /// Point-in-time copy of the currently published set.
    pub fn snapshot(&self) -> CoefficientSet {
        let idx = self.active_slot.load(Ordering::Acquire);
        let slot = self.slots[idx].lock().unwrap_or_else(|e| e.into_inner());
        *slot
    }

    /// Aggregate magnitude response in dB across the published cascade,
    /// one value per log-spaced bin. Read-only and idempotent.
    pub fn frequency_response(&self) -> [f32; RESPONSE_BINS] {
        let set = self.snapshot();
        let sample_rate = self.sample_rate();

        let mut response = [0.0; RESPONSE_BINS];
        if sample_rate <= 0.0 {
            return response;
        }

        for (out, &freq) in response.iter_mut().zip(bin_frequencies().iter()) {
            let magnitude: f32 = set.stages[..set.active]
                .iter()
                .map(|c| c.magnitude_at(freq, sample_rate))
                .product();
            *out = 20.0 * magnitude.max(MAGNITUDE_FLOOR).log10();
        }
        response
    }
}
