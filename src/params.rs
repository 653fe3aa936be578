//! Host-facing filter parameters.
//!
//! The host shim reads these from its own parameter tree and hands the
//! core a plain value snapshot once per audio block. All continuous
//! fields are clamped again on ingestion so the DSP never sees an
//! out-of-range value, regardless of what the host does.

use serde::{Deserialize, Serialize};

pub const CUTOFF_MIN_HZ: f32 = 20.0;
pub const CUTOFF_MAX_HZ: f32 = 20000.0;
pub const Q_MIN: f32 = 0.1;
pub const Q_MAX: f32 = 10.0;
pub const RESONANCE_MIN_DB: f32 = -10.0;
pub const RESONANCE_MAX_DB: f32 = 10.0;

/// Skew factor of the host's log-scaled cutoff control.
pub const CUTOFF_SKEW: f32 = 0.3;

/// Values substituted when the matching per-parameter bypass is engaged.
pub const NEUTRAL_CUTOFF_HZ: f32 = 1000.0;
pub const NEUTRAL_Q: f32 = 0.707;
pub const NEUTRAL_RESONANCE_DB: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    HighPass,
    LowPass,
    BandPass,
    Notch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slope {
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    /// Number of cascaded biquad stages needed for this roll-off.
    #[inline]
    pub fn stage_count(self) -> usize {
        match self {
            Slope::Db12 => 1,
            Slope::Db24 => 2,
            Slope::Db36 => 3,
            Slope::Db48 => 4,
        }
    }

    pub fn db_per_octave(self) -> u32 {
        self.stage_count() as u32 * 12
    }
}

/// Q-distribution scheme across cascaded stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Characteristic {
    Butterworth,
    LinkwitzRiley,
    Bessel,
}

/// Per-block parameter snapshot supplied by the host shim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParameters {
    pub cutoff_hz: f32,
    pub q: f32,
    pub resonance_db: f32,
    pub filter_type: FilterType,
    pub slope: Slope,
    pub characteristic: Characteristic,
    pub cutoff_bypass: bool,
    pub q_bypass: bool,
    pub resonance_bypass: bool,
    pub bypass: bool,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            cutoff_hz: 1000.0,
            q: 0.707,
            resonance_db: 0.0,
            filter_type: FilterType::HighPass,
            slope: Slope::Db24,
            characteristic: Characteristic::Butterworth,
            cutoff_bypass: false,
            q_bypass: false,
            resonance_bypass: false,
            bypass: false,
        }
    }
}

impl FilterParameters {
    /// Returns a copy with every continuous field clamped to its domain.
    pub fn clamped(mut self) -> Self {
        self.cutoff_hz = self.cutoff_hz.clamp(CUTOFF_MIN_HZ, CUTOFF_MAX_HZ);
        self.q = self.q.clamp(Q_MIN, Q_MAX);
        self.resonance_db = self
            .resonance_db
            .clamp(RESONANCE_MIN_DB, RESONANCE_MAX_DB);
        self
    }
}

/// Maps a 0..1 knob position onto the skewed cutoff range.
pub fn normalized_to_cutoff(normalized: f32) -> f32 {
    let n = normalized.clamp(0.0, 1.0);
    CUTOFF_MIN_HZ + (CUTOFF_MAX_HZ - CUTOFF_MIN_HZ) * n.powf(1.0 / CUTOFF_SKEW)
}

/// Inverse of [`normalized_to_cutoff`].
pub fn cutoff_to_normalized(cutoff_hz: f32) -> f32 {
    let hz = cutoff_hz.clamp(CUTOFF_MIN_HZ, CUTOFF_MAX_HZ);
    ((hz - CUTOFF_MIN_HZ) / (CUTOFF_MAX_HZ - CUTOFF_MIN_HZ)).powf(CUTOFF_SKEW)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_host_layout() {
        let p = FilterParameters::default();
        assert_eq!(p.cutoff_hz, 1000.0);
        assert_eq!(p.q, 0.707);
        assert_eq!(p.resonance_db, 0.0);
        assert_eq!(p.filter_type, FilterType::HighPass);
        assert_eq!(p.slope, Slope::Db24);
        assert_eq!(p.characteristic, Characteristic::Butterworth);
        assert!(!p.bypass);
    }

    #[test]
    fn test_stage_count_tracks_slope() {
        assert_eq!(Slope::Db12.stage_count(), 1);
        assert_eq!(Slope::Db24.stage_count(), 2);
        assert_eq!(Slope::Db36.stage_count(), 3);
        assert_eq!(Slope::Db48.stage_count(), 4);
        assert_eq!(Slope::Db48.db_per_octave(), 48);
    }

    #[test]
    fn test_clamping() {
        let p = FilterParameters {
            cutoff_hz: 5.0,
            q: 100.0,
            resonance_db: -50.0,
            ..FilterParameters::default()
        }
        .clamped();
        assert_eq!(p.cutoff_hz, CUTOFF_MIN_HZ);
        assert_eq!(p.q, Q_MAX);
        assert_eq!(p.resonance_db, RESONANCE_MIN_DB);
    }

    #[test]
    fn test_normalized_cutoff_mapping() {
        assert!((normalized_to_cutoff(0.0) - CUTOFF_MIN_HZ).abs() < 1e-3);
        assert!((normalized_to_cutoff(1.0) - CUTOFF_MAX_HZ).abs() < 1e-1);

        // Skew pushes the midpoint well below the linear middle
        let mid = normalized_to_cutoff(0.5);
        assert!(mid > 1000.0 && mid < 4000.0);

        for &hz in &[20.0, 100.0, 1000.0, 5000.0, 20000.0] {
            let roundtrip = normalized_to_cutoff(cutoff_to_normalized(hz));
            assert!(
                (roundtrip - hz).abs() / hz < 1e-3,
                "roundtrip {hz} -> {roundtrip}"
            );
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let p = FilterParameters {
            cutoff_hz: 440.0,
            q: 2.5,
            resonance_db: 3.0,
            filter_type: FilterType::Notch,
            slope: Slope::Db36,
            characteristic: Characteristic::Bessel,
            cutoff_bypass: true,
            q_bypass: false,
            resonance_bypass: true,
            bypass: false,
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: FilterParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
