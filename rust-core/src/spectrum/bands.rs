//! Low/high band classification of a complex spectrum
//!
//! Bin `i` maps to low slot `i - LOW_BAND_START` for `i` in
//! `[LOW_BAND_START, LOW_BAND_END)` and to high slot `i - HIGH_BAND_START`
//! for `i >= HIGH_BAND_START`. DC and Nyquist are never classified.
//!
//! With the fixed layout only low slots 0..4 are ever written and bin 6
//! belongs to neither band. Consumers rely on this exact mapping.

use crate::config::{
    HIGH_BAND_SLOTS, HIGH_BAND_START, LOW_BAND_END, LOW_BAND_SLOTS, LOW_BAND_START,
};
use num_complex::Complex;

/// Where a transform bin lands in the output bands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinClass {
    /// DC, Nyquist or out of range; never examined
    Excluded,
    /// Low-band slot
    Low(usize),
    /// High-band slot
    High(usize),
    /// Examined but outside both bands; forced to zero, nothing written
    Unmapped,
}

/// Classify bin `i` of a window of `window_size` samples
pub fn classify_bin(i: usize, window_size: usize) -> BinClass {
    if i == 0 || i >= window_size / 2 {
        BinClass::Excluded
    } else if (LOW_BAND_START..LOW_BAND_END).contains(&i) && i - LOW_BAND_START < LOW_BAND_SLOTS {
        BinClass::Low(i - LOW_BAND_START)
    } else if i >= HIGH_BAND_START && i - HIGH_BAND_START < HIGH_BAND_SLOTS {
        BinClass::High(i - HIGH_BAND_START)
    } else {
        BinClass::Unmapped
    }
}

/// Per-band scaling applied during classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScaling {
    pub low_sensitivity: f32,
    pub high_sensitivity: f32,
    pub clip_ceiling: f32,
}

/// Low and high band magnitudes
#[derive(Debug, Clone, PartialEq)]
pub struct BandFrame {
    pub low: [f32; LOW_BAND_SLOTS],
    pub high: [f32; HIGH_BAND_SLOTS],
}

impl Default for BandFrame {
    fn default() -> Self {
        Self {
            low: [0.0; LOW_BAND_SLOTS],
            high: [0.0; HIGH_BAND_SLOTS],
        }
    }
}

impl BandFrame {
    pub fn clear(&mut self) {
        self.low.fill(0.0);
        self.high.fill(0.0);
    }

    pub fn copy_from(&mut self, other: &BandFrame) {
        self.low.copy_from_slice(&other.low);
        self.high.copy_from_slice(&other.high);
    }

    pub fn is_silent(&self) -> bool {
        self.low.iter().chain(self.high.iter()).all(|&m| m == 0.0)
    }
}

/// Clamp a magnitude into `[0, ceiling]`; NaN collapses to the ceiling
#[inline]
pub fn clip_magnitude(magnitude: f32, ceiling: f32) -> f32 {
    magnitude.min(ceiling).max(0.0)
}

/// Classify a spectrum into `frame`
///
/// Slots without a bin mapped to them keep their previous value.
///
/// # Returns
/// The largest high-band magnitude written during this pass
pub fn classify_spectrum(
    spectrum: &[Complex<f32>],
    window_size: usize,
    scaling: &BandScaling,
    frame: &mut BandFrame,
) -> f32 {
    let norm = window_size as f32;
    let mut high_peak = 0.0f32;

    for (i, bin) in spectrum.iter().enumerate().take(window_size / 2).skip(1) {
        let magnitude = bin.norm() / norm;

        match classify_bin(i, window_size) {
            BinClass::Low(slot) => {
                frame.low[slot] = clip_magnitude(magnitude * scaling.low_sensitivity, scaling.clip_ceiling);
            }
            BinClass::High(slot) => {
                let m = clip_magnitude(magnitude * scaling.high_sensitivity, scaling.clip_ceiling);
                frame.high[slot] = m;
                high_peak = high_peak.max(m);
            }
            BinClass::Unmapped | BinClass::Excluded => {}
        }
    }

    high_peak
}
