//! Python bindings for the capture engine
//!
//! Engines are addressed by integer handles, mirroring how a native
//! embedding keeps them.

use pyo3::prelude::*;
use numpy::PyReadwriteArray1;
use crate::audio::input::{list_input_devices, CpalBackend};
use crate::config::EngineConfig;
use crate::registry::{EngineHandle, EngineRegistry};

/// Audio device information exposed to Python
#[pyclass(name = "AudioDeviceInfo")]
#[derive(Clone)]
pub struct PyAudioDeviceInfo {
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub sample_rate: u32,
    #[pyo3(get)]
    pub channels: u16,
}

/// Table of capture engines
#[pyclass(name = "BandEngine", unsendable)]
pub struct PyBandEngine {
    registry: EngineRegistry<CpalBackend>,
    config: EngineConfig,
}

fn runtime_error(msg: String) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(msg)
}

#[pymethods]
impl PyBandEngine {
    /// Create an engine table sharing one configuration
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
            registry: EngineRegistry::new(),
            config,
        })
    }

    /// List available input devices
    #[staticmethod]
    fn list_input_devices() -> PyResult<Vec<PyAudioDeviceInfo>> {
        let devices = list_input_devices()
            .map_err(|e| runtime_error(format!("Failed to list devices: {}", e)))?;

        Ok(devices
            .into_iter()
            .map(|d| PyAudioDeviceInfo {
                name: d.name,
                sample_rate: d.sample_rate,
                channels: d.channels,
            })
            .collect())
    }

    /// Allocate an engine without starting capture
    ///
    /// Returns:
    ///     Opaque engine handle
    #[pyo3(signature = (device_name=None))]
    fn create(&mut self, device_name: Option<String>) -> PyResult<u64> {
        let backend = match device_name {
            Some(name) => CpalBackend::with_device_name(name),
            None => CpalBackend::default_device(),
        };

        self.registry
            .create_engine(backend, self.config.clone())
            .map(EngineHandle::to_raw)
            .map_err(|e| runtime_error(format!("Failed to create engine: {}", e)))
    }

    /// Start capture (idempotent)
    ///
    /// Returns:
    ///     True if the engine is running
    fn start(&mut self, handle: u64) -> bool {
        self.registry.start_engine(EngineHandle::from_raw(handle))
    }

    /// Stop capture (idempotent)
    fn stop(&mut self, handle: u64) {
        self.registry.stop_engine(EngineHandle::from_raw(handle));
    }

    /// Stop capture and release the engine
    fn destroy(&mut self, handle: u64) -> bool {
        self.registry.destroy_engine(EngineHandle::from_raw(handle))
    }

    /// Fill float32 arrays with the latest bands
    ///
    /// Args:
    ///     low_out: float32 array with LOW_BAND_SLOTS elements
    ///     high_out: float32 array with HIGH_BAND_SLOTS elements
    ///     timeout_ms: Maximum wait for a fresh analysis pass (default from config)
    ///
    /// Returns:
    ///     True if the data is fresh, False if the previous bands were returned
    #[pyo3(signature = (handle, low_out, high_out, timeout_ms=None))]
    fn poll_bands(
        &self,
        handle: u64,
        mut low_out: PyReadwriteArray1<f32>,
        mut high_out: PyReadwriteArray1<f32>,
        timeout_ms: Option<u64>,
    ) -> PyResult<bool> {
        let timeout_ms =
            timeout_ms.unwrap_or(self.config.poll_timeout.as_millis() as u64);

        let low = low_out
            .as_slice_mut()
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;
        let high = high_out
            .as_slice_mut()
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;

        self.registry
            .poll_bands(EngineHandle::from_raw(handle), low, high, timeout_ms)
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))
    }

    /// Zero the published bands
    fn reset_bands(&self, handle: u64) -> PyResult<()> {
        self.registry
            .reset_bands(EngineHandle::from_raw(handle))
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))
    }

    /// Whether the engine is capturing
    fn is_running(&self, handle: u64) -> bool {
        self.registry
            .get(EngineHandle::from_raw(handle))
            .map(|engine| engine.is_running())
            .unwrap_or(false)
    }
}
