//! Python bindings for offline band analysis

use pyo3::prelude::*;
use numpy::{PyArray1, PyReadonlyArray1};
use crate::config::WINDOW_SIZE;
use crate::spectrum::SpectrumAnalyzer;
use crate::summary::BandLevels;

/// Band analyzer exposed to Python
#[pyclass(name = "SpectrumAnalyzer")]
pub struct PySpectrumAnalyzer {
    analyzer: SpectrumAnalyzer,
    clip_ceiling: f32,
}

#[pymethods]
impl PySpectrumAnalyzer {
    /// Create a new band analyzer
    ///
    /// Args:
    ///     sample_rate: 44100 or 48000
    ///     gain: Gain applied before the transform
    ///     low_sensitivity: Low-band multiplier
    ///     high_sensitivity: High-band multiplier
    ///     clip_ceiling: Upper bound for every magnitude
    #[new]
    #[pyo3(signature = (sample_rate=44100, gain=None, low_sensitivity=None, high_sensitivity=None, clip_ceiling=None))]
    fn new(
        sample_rate: u32,
        gain: Option<f32>,
        low_sensitivity: Option<f32>,
        high_sensitivity: Option<f32>,
        clip_ceiling: Option<f32>,
    ) -> PyResult<Self> {
        let config = super::config_from_args(
            sample_rate,
            gain,
            low_sensitivity,
            high_sensitivity,
            clip_ceiling,
        )?;

        Ok(Self {
            analyzer: SpectrumAnalyzer::new(&config),
            clip_ceiling: config.clip_ceiling,
        })
    }

    /// Analyze one buffer
    ///
    /// Args:
    ///     signal: float32 samples; only the first WINDOW_SIZE are used
    ///
    /// Returns:
    ///     (low_band, high_band) as numpy arrays
    fn analyze<'py>(
        &mut self,
        py: Python<'py>,
        signal: PyReadonlyArray1<f32>,
    ) -> PyResult<(&'py PyArray1<f32>, &'py PyArray1<f32>)> {
        let sig = signal
            .as_slice()
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;
        let bands = self.analyzer.analyze(sig);

        Ok((
            PyArray1::from_slice(py, &bands.low),
            PyArray1::from_slice(py, &bands.high),
        ))
    }

    /// Clear the sample window and bands
    fn reset(&mut self) {
        self.analyzer.reset();
    }

    /// Get the analysis window size
    #[staticmethod]
    fn window_size() -> usize {
        WINDOW_SIZE
    }

    /// Get the clip ceiling
    fn get_clip_ceiling(&self) -> f32 {
        self.clip_ceiling
    }
}

/// Summarize bands as (low average, high peak)
#[pyfunction]
#[pyo3(signature = (low, high, ceiling=1000.0))]
pub fn band_levels(
    low: PyReadonlyArray1<f32>,
    high: PyReadonlyArray1<f32>,
    ceiling: f32,
) -> PyResult<(f32, f32)> {
    let low = low
        .as_slice()
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;
    let high = high
        .as_slice()
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;

    let levels = BandLevels::from_bands(low, high, ceiling);
    Ok((levels.low_average, levels.high_peak))
}
