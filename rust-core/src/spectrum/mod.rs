//! Spectral analysis with FFT

pub mod fft;
pub mod bands;
pub mod analysis;

pub use fft::FftEngine;
pub use bands::{BandFrame, BinClass};
pub use analysis::{AnalysisPass, SpectrumAnalyzer};
