//! Per-channel filter cascade.
//!
//! Four fixed stage slots, processed up to the active count only.
//! Inactive slots keep all-pass coefficients so a slope change never
//! alters the topology, but they are not invoked on the hot path.

use super::biquad::BiquadStage;
use super::synthesis::{CoefficientSet, MAX_STAGES};

#[derive(Debug, Clone, Copy)]
pub struct FilterCascade {
    stages: [BiquadStage; MAX_STAGES],
    active: usize,
}

impl Default for FilterCascade {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCascade {
    pub fn new() -> Self {
        Self {
            stages: [BiquadStage::new(); MAX_STAGES],
            active: 0,
        }
    }

    /// Installs a freshly synthesized set into all four slots. Delay
    /// state is preserved; continuous parameter moves must not click.
    pub fn apply(&mut self, set: &CoefficientSet) {
        for (stage, coefs) in self.stages.iter_mut().zip(set.stages.iter()) {
            stage.set_coefficients(*coefs);
        }
        self.active = set.active.min(MAX_STAGES);
    }

    /// Runs one sample through the active stages.
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let mut x = sample;
        for stage in &mut self.stages[..self.active] {
            x = stage.process(x);
        }
        x
    }

    /// Zeroes every slot's delay state. Must run whenever the filter
    /// structure (type, slope, characteristic) changes; stale state from
    /// a different filter shape leaks energy otherwise.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset_state();
        }
    }

    #[allow(dead_code)]
    pub fn active_stages(&self) -> usize {
        self.active
    }
}
