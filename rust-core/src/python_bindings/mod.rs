//! PyO3 bindings for Python integration

use pyo3::prelude::*;

mod engine_bindings;
mod spectrum_bindings;

/// Python module definition
#[pymodule]
fn bandscope(_py: Python, m: &PyModule) -> PyResult<()> {
    crate::init_logging();

    m.add_class::<engine_bindings::PyBandEngine>()?;
    m.add_class::<engine_bindings::PyAudioDeviceInfo>()?;
    m.add_class::<spectrum_bindings::PySpectrumAnalyzer>()?;
    m.add_function(wrap_pyfunction!(spectrum_bindings::band_levels, m)?)?;

    m.add("LOW_BAND_SLOTS", crate::config::LOW_BAND_SLOTS)?;
    m.add("HIGH_BAND_SLOTS", crate::config::HIGH_BAND_SLOTS)?;

    Ok(())
}

pub(crate) fn config_from_args(
    sample_rate: u32,
    gain: Option<f32>,
    low_sensitivity: Option<f32>,
    high_sensitivity: Option<f32>,
    clip_ceiling: Option<f32>,
) -> PyResult<crate::config::EngineConfig> {
    use crate::config::{EngineConfig, SampleRate};

    let rate = SampleRate::try_from(sample_rate)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;

    let mut config = EngineConfig::default().with_sample_rate(rate);
    if let Some(gain) = gain {
        config.gain = gain;
    }
    if let Some(low) = low_sensitivity {
        config.low_sensitivity = low;
    }
    if let Some(high) = high_sensitivity {
        config.high_sensitivity = high;
    }
    if let Some(ceiling) = clip_ceiling {
        config.clip_ceiling = ceiling;
    }

    config
        .validate()
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;
    Ok(config)
}
