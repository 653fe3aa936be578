//! Waveform capture for the monitoring UI.
//!
//! Channel-averaged mirrors of the pre- and post-filter signal go into
//! two fixed-size rings sharing one write cursor. The audio thread only
//! ever `try_lock`s the rings and skips the block when the observer is
//! mid-copy: capture is best-effort, the signal path never waits on the
//! UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub const WAVEFORM_LEN: usize = 512;

/// Per-block capture cap; bounds the worst-case time under the lock.
pub const MAX_FRAMES_PER_BLOCK: usize = 128;

struct Rings {
    input: [f32; WAVEFORM_LEN],
    output: [f32; WAVEFORM_LEN],
    write_pos: usize,
}

pub struct WaveformCapture {
    rings: Mutex<Rings>,
    enabled: AtomicBool,
}

impl Default for WaveformCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformCapture {
    pub fn new() -> Self {
        Self {
            rings: Mutex::new(Rings {
                input: [0.0; WAVEFORM_LEN],
                output: [0.0; WAVEFORM_LEN],
                write_pos: 0,
            }),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Zeroes both rings and rewinds the cursor.
    pub fn reset(&self) {
        let mut rings = self.rings.lock().unwrap_or_else(|e| e.into_inner());
        rings.input = [0.0; WAVEFORM_LEN];
        rings.output = [0.0; WAVEFORM_LEN];
        rings.write_pos = 0;
    }

    /// Writes up to [`MAX_FRAMES_PER_BLOCK`] channel-averaged frames of
    /// the block into both rings. `input` and `output` are parallel
    /// channel slices of equal length.
    pub fn capture(&self, input: &[&[f32]], output: &[&[f32]]) {
        if !self.is_enabled() {
            return;
        }

        let num_channels = input.len().min(output.len());
        if num_channels == 0 {
            return;
        }
        let num_samples = input[0].len().min(MAX_FRAMES_PER_BLOCK);

        let Ok(mut rings) = self.rings.try_lock() else {
            // Observer is copying a snapshot; drop this block
            return;
        };

        let scale = 1.0 / num_channels as f32;
        for i in 0..num_samples {
            let mut in_avg = 0.0;
            let mut out_avg = 0.0;
            for ch in 0..num_channels {
                in_avg += input[ch][i];
                out_avg += output[ch][i];
            }

            let pos = rings.write_pos;
            rings.input[pos] = in_avg * scale;
            rings.output[pos] = out_avg * scale;
            rings.write_pos = (pos + 1) % WAVEFORM_LEN;
        }
    }

    /// Whole-buffer snapshot of the input mirror, oldest sample first.
    pub fn input_snapshot(&self) -> [f32; WAVEFORM_LEN] {
        let (buf, pos) = {
            let rings = self.rings.lock().unwrap_or_else(|e| e.into_inner());
            (rings.input, rings.write_pos)
        };
        rotate_to_temporal(buf, pos)
    }

    /// Whole-buffer snapshot of the output mirror, oldest sample first.
    pub fn output_snapshot(&self) -> [f32; WAVEFORM_LEN] {
        let (buf, pos) = {
            let rings = self.rings.lock().unwrap_or_else(|e| e.into_inner());
            (rings.output, rings.write_pos)
        };
        rotate_to_temporal(buf, pos)
    }
}

/// The cursor points at the oldest slot; unrolling from there yields the
/// last [`WAVEFORM_LEN`] samples in write order.
fn rotate_to_temporal(buf: [f32; WAVEFORM_LEN], write_pos: usize) -> [f32; WAVEFORM_LEN] {
    let mut out = [0.0; WAVEFORM_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = buf[(write_pos + i) % WAVEFORM_LEN];
    }
    out
}
