//! Biquad filter primitives (IIR 2nd order)
//!
//! Coefficients and delay state are split: a [`StageCoefficients`] value
//! is immutable once designed and is replaced wholesale, while each
//! [`BiquadStage`] owns its own delay line. That split is what lets one
//! coefficient set drive several cascade slots and the response
//! estimator at the same time.
//!
//! # Design Notes
//! - RBJ-style bilinear designs, normalized by 1/a0 at design time
//! - All operations are safe for the audio thread (no allocations)

use std::f32::consts::PI;

/// Five normalized coefficients of one second-order section:
/// `a0..a2` feed-forward, `b1/b2` feedback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageCoefficients {
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub b1: f32,
    pub b2: f32,
}

impl StageCoefficients {
    /// Pass-through section (unity gain, no poles or zeros).
    pub fn unity() -> Self {
        Self {
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
        }
    }

    pub fn low_pass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let alpha = w0.sin() / (2.0 * q.max(1e-6));
        let cw0 = w0.cos();

        let inv_a0 = 1.0 / (1.0 + alpha);
        Self {
            a0: ((1.0 - cw0) * 0.5) * inv_a0,
            a1: (1.0 - cw0) * inv_a0,
            a2: ((1.0 - cw0) * 0.5) * inv_a0,
            b1: (-2.0 * cw0) * inv_a0,
            b2: (1.0 - alpha) * inv_a0,
        }
    }

    pub fn high_pass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let alpha = w0.sin() / (2.0 * q.max(1e-6));
        let cw0 = w0.cos();

        let inv_a0 = 1.0 / (1.0 + alpha);
        Self {
            a0: ((1.0 + cw0) * 0.5) * inv_a0,
            a1: -(1.0 + cw0) * inv_a0,
            a2: ((1.0 + cw0) * 0.5) * inv_a0,
            b1: (-2.0 * cw0) * inv_a0,
            b2: (1.0 - alpha) * inv_a0,
        }
    }

    /// Band-pass with constant 0 dB peak gain.
    pub fn band_pass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let alpha = w0.sin() / (2.0 * q.max(1e-6));
        let cw0 = w0.cos();

        let inv_a0 = 1.0 / (1.0 + alpha);
        Self {
            a0: alpha * inv_a0,
            a1: 0.0,
            a2: -alpha * inv_a0,
            b1: (-2.0 * cw0) * inv_a0,
            b2: (1.0 - alpha) * inv_a0,
        }
    }

    pub fn notch(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let alpha = w0.sin() / (2.0 * q.max(1e-6));
        let cw0 = w0.cos();

        let inv_a0 = 1.0 / (1.0 + alpha);
        Self {
            a0: 1.0 * inv_a0,
            a1: (-2.0 * cw0) * inv_a0,
            a2: 1.0 * inv_a0,
            b1: (-2.0 * cw0) * inv_a0,
            b2: (1.0 - alpha) * inv_a0,
        }
    }

    /// All-pass at the reference frequency, Q = 1/sqrt(2). Unity
    /// magnitude everywhere; used to populate inactive cascade slots.
    pub fn all_pass(sample_rate: f32, cutoff: f32) -> Self {
        let q = std::f32::consts::FRAC_1_SQRT_2;
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cw0 = w0.cos();

        let inv_a0 = 1.0 / (1.0 + alpha);
        Self {
            a0: (1.0 - alpha) * inv_a0,
            a1: (-2.0 * cw0) * inv_a0,
            a2: (1.0 + alpha) * inv_a0,
            b1: (-2.0 * cw0) * inv_a0,
            b2: (1.0 - alpha) * inv_a0,
        }
    }

    /// Magnitude response |H(e^jw)| at one frequency.
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * freq / sample_rate;
        let (cw, sw) = (w.cos(), w.sin());
        let (c2w, s2w) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.a0 + self.a1 * cw + self.a2 * c2w;
        let num_im = -(self.a1 * sw + self.a2 * s2w);
        let den_re = 1.0 + self.b1 * cw + self.b2 * c2w;
        let den_im = -(self.b1 * sw + self.b2 * s2w);

        let num = num_re * num_re + num_im * num_im;
        let den = (den_re * den_re + den_im * den_im).max(1e-20);
        (num / den).sqrt()
    }
}

/// One cascade slot: a coefficient set plus its delay line.
#[derive(Debug, Clone, Copy)]
pub struct BiquadStage {
    coefs: StageCoefficients,
    z1: f32,
    z2: f32,
}

impl Default for BiquadStage {
    fn default() -> Self {
        Self::new()
    }
}

impl BiquadStage {
    pub fn new() -> Self {
        Self {
            coefs: StageCoefficients::unity(),
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Replaces the coefficients. Delay state is untouched; structural
    /// resets go through [`reset_state`](Self::reset_state).
    #[inline]
    pub fn set_coefficients(&mut self, coefs: StageCoefficients) {
        self.coefs = coefs;
    }

    /// Process a single sample (transposed direct form II).
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coefs;
        let out = input * c.a0 + self.z1;

        // Anti-denormal: tiny DC offset
        self.z1 = input * c.a1 + self.z2 - c.b1 * out + 1e-25;
        self.z2 = input * c.a2 - c.b2 * out + 1e-25;

        out
    }

    /// Explicitly clear the delay state.
    #[inline]
    pub fn reset_state(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
