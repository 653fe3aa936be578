//! Cascade coefficient synthesis.
//!
//! Derives one coefficient set per cascade slot from the current
//! {type, cutoff, Q, resonance trim, characteristic, stage count}. The
//! per-characteristic Q redistribution makes the cascaded aggregate
//! approximate the named classical response; inactive trailing slots are
//! populated with all-pass sections at a fixed reference frequency so
//! the processing topology never changes shape.

use super::biquad::StageCoefficients;
use crate::params::{Characteristic, FilterType};

pub const MAX_STAGES: usize = 4;

/// Inactive slots are parked as all-pass sections at this frequency.
const ALLPASS_REFERENCE_HZ: f32 = 1000.0;

/// Effective Q is clamped here regardless of what the caller passes.
const EFFECTIVE_Q_MIN: f32 = 0.1;
const EFFECTIVE_Q_MAX: f32 = 20.0;

/// Full set of cascade slot coefficients plus the active stage count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientSet {
    pub stages: [StageCoefficients; MAX_STAGES],
    pub active: usize,
}

impl CoefficientSet {
    /// Set with no active stages; slots are pass-through.
    pub fn empty() -> Self {
        Self {
            stages: [StageCoefficients::unity(); MAX_STAGES],
            active: 0,
        }
    }
}

/// Pure coefficient synthesis. Inputs other than Q are assumed
/// pre-clamped by the caller.
pub fn synthesize(
    filter_type: FilterType,
    cutoff: f32,
    q: f32,
    resonance_db: f32,
    characteristic: Characteristic,
    stage_count: usize,
    sample_rate: f32,
) -> CoefficientSet {
    let stage_count = stage_count.clamp(1, MAX_STAGES);

    // Resonance trim folds additively into the effective Q
    let effective_q = (q + resonance_db / 10.0).clamp(EFFECTIVE_Q_MIN, EFFECTIVE_Q_MAX);

    let stage_q = match characteristic {
        Characteristic::Butterworth if stage_count > 1 => {
            effective_q * 0.707 / (stage_count as f32).sqrt()
        }
        Characteristic::LinkwitzRiley => effective_q * 0.5,
        Characteristic::Bessel => effective_q * 0.577 / (stage_count as f32).sqrt(),
        _ => effective_q,
    };

    let design = |cutoff: f32, q: f32| match filter_type {
        FilterType::HighPass => StageCoefficients::high_pass(sample_rate, cutoff, q),
        FilterType::LowPass => StageCoefficients::low_pass(sample_rate, cutoff, q),
        FilterType::BandPass => StageCoefficients::band_pass(sample_rate, cutoff, q),
        FilterType::Notch => StageCoefficients::notch(sample_rate, cutoff, q),
    };

    let mut stages = [StageCoefficients::all_pass(sample_rate, ALLPASS_REFERENCE_HZ); MAX_STAGES];
    for slot in stages.iter_mut().take(stage_count) {
        *slot = design(cutoff, stage_q);
    }

    CoefficientSet {
        stages,
        active: stage_count,
    }
}
