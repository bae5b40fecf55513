//! Spectrum analyzer
//!
//! Runs inside the capture callback: gain, forward transform, band
//! classification. Owns all of its scratch space so a pass never allocates.

use super::bands::{classify_spectrum, BandFrame, BandScaling};
use super::fft::FftEngine;
use crate::config::{EngineConfig, WINDOW_SIZE};

/// Summary of one analysis pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisPass {
    /// Samples taken from the device buffer (at most `WINDOW_SIZE`)
    pub samples_used: usize,

    /// Samples dropped because the buffer was longer than the window
    pub samples_dropped: usize,

    /// Largest high-band magnitude written
    pub high_peak: f32,
}

/// Real-time band analyzer
pub struct SpectrumAnalyzer {
    gain: f32,
    scaling: BandScaling,
    fft_engine: FftEngine,

    /// Gained sample window; positions past a short buffer keep the previous pass
    window: Vec<f32>,

    bands: BandFrame,
}

impl SpectrumAnalyzer {
    /// Create new spectrum analyzer
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            gain: config.gain,
            scaling: BandScaling {
                low_sensitivity: config.low_sensitivity,
                high_sensitivity: config.high_sensitivity,
                clip_ceiling: config.clip_ceiling,
            },
            fft_engine: FftEngine::new(WINDOW_SIZE),
            window: vec![0.0; WINDOW_SIZE],
            bands: BandFrame::default(),
        }
    }

    /// Analyze one device buffer
    ///
    /// Only the first `WINDOW_SIZE` samples are used; the rest are dropped.
    /// The resulting bands are available from [`bands`](Self::bands).
    pub fn process(&mut self, raw: &[f32]) -> AnalysisPass {
        let used = raw.len().min(WINDOW_SIZE);
        for (dst, &src) in self.window[..used].iter_mut().zip(raw) {
            *dst = src * self.gain;
        }

        let spectrum = self.fft_engine.process(&self.window);
        let high_peak = classify_spectrum(spectrum, WINDOW_SIZE, &self.scaling, &mut self.bands);

        AnalysisPass {
            samples_used: used,
            samples_dropped: raw.len() - used,
            high_peak,
        }
    }

    /// Analyze one device buffer and return the band arrays
    pub fn analyze(&mut self, raw: &[f32]) -> &BandFrame {
        self.process(raw);
        &self.bands
    }

    /// Bands from the most recent pass
    pub fn bands(&self) -> &BandFrame {
        &self.bands
    }

    /// Clear the sample window and bands
    pub fn reset(&mut self) {
        self.window.fill(0.0);
        self.bands.clear();
    }
}
