//! Audio input capture using cpal
//!
//! Real-time capture from microphone or line-in, exposed through the
//! [`CaptureBackend`] seam.

use super::capture::{
    BufferInfo, CallbackAction, CaptureBackend, CaptureStream, DataCallback, StreamError,
    StreamRequest,
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, Stream, StreamConfig};

/// Audio input device information
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Opens capture streams on a cpal input device
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    /// Backend bound to the host's default input device
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Backend bound to a named input device
    pub fn with_device_name(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn resolve_device(&self) -> Result<Device, StreamError> {
        let host = cpal::default_host();

        match &self.device_name {
            None => host.default_input_device().ok_or(StreamError::NoDevice),
            Some(wanted) => host
                .input_devices()
                .map_err(|e| StreamError::Open(e.to_string()))?
                .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                .ok_or(StreamError::NoDevice),
        }
    }
}

impl CaptureBackend for CpalBackend {
    type Stream = CpalStream;

    fn open_stream(
        &mut self,
        request: &StreamRequest,
        mut callback: DataCallback,
    ) -> Result<CpalStream, StreamError> {
        let device = self.resolve_device()?;
        let name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        let rate = request.sample_rate.hz();

        let supported = device
            .supported_input_configs()
            .map_err(|e| StreamError::Open(e.to_string()))?
            .any(|range| {
                range.channels() == request.channels
                    && range.sample_format() == cpal::SampleFormat::F32
                    && range.min_sample_rate().0 <= rate
                    && rate <= range.max_sample_rate().0
            });

        if !supported {
            return Err(StreamError::UnsupportedConfig(format!(
                "{}: no {}-channel f32 input at {} Hz",
                name, request.channels, rate
            )));
        }

        // cpal has no performance-mode knob; the default buffer size is the
        // lowest latency the host offers without risking underruns
        let stream_config = StreamConfig {
            channels: request.channels,
            sample_rate: cpal::SampleRate(rate),
            buffer_size: BufferSize::Default,
        };

        let channels = request.channels.max(1);
        let mut halted = false;
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if halted {
                        return;
                    }
                    let info = BufferInfo {
                        frames: data.len() / channels as usize,
                        channels,
                    };
                    if callback(data, info) == CallbackAction::Stop {
                        halted = true;
                    }
                },
                move |err| {
                    log::error!("Audio input error: {}", err);
                },
                None,
            )
            .map_err(|e| StreamError::Open(e.to_string()))?;

        log::info!("Opened input stream on {} ({} Hz, {} ch)", name, rate, channels);

        Ok(CpalStream {
            stream: Some(stream),
        })
    }
}

/// Open cpal input stream
pub struct CpalStream {
    stream: Option<Stream>,
}

impl CaptureStream for CpalStream {
    fn start(&mut self) -> Result<(), StreamError> {
        let stream = self.stream.as_ref().ok_or(StreamError::Disconnected)?;
        stream.play().map_err(|e| StreamError::Start(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        let stream = self.stream.as_ref().ok_or(StreamError::Disconnected)?;
        stream.pause().map_err(|e| StreamError::Stop(e.to_string()))
    }

    fn close(&mut self) -> Result<(), StreamError> {
        // Dropping the cpal stream releases the device
        self.stream.take().map(drop).ok_or(StreamError::Disconnected)
    }
}

/// List available audio input devices
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>, StreamError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let device_iter = host
        .input_devices()
        .map_err(|e| StreamError::Open(e.to_string()))?;

    for device in device_iter {
        if let Ok(name) = device.name() {
            if let Ok(config) = device.default_input_config() {
                devices.push(AudioDeviceInfo {
                    name,
                    sample_rate: config.sample_rate().0,
                    channels: config.channels(),
                });
            }
        }
    }

    Ok(devices)
}
