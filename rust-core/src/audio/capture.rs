//! Capture subsystem interface
//!
//! The engine only needs a backend that opens an input stream for a fixed
//! request and drives a callback once per arriving buffer. cpal provides the
//! real implementation; the mock backend drives the same callback in tests.

use crate::config::SampleRate;
use thiserror::Error;

/// Result codes reported by a capture backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("No audio input device found")]
    NoDevice,

    #[error("Requested stream configuration is not supported: {0}")]
    UnsupportedConfig(String),

    #[error("Failed to open stream: {0}")]
    Open(String),

    #[error("Failed to start stream: {0}")]
    Start(String),

    #[error("Failed to stop stream: {0}")]
    Stop(String),

    #[error("Failed to close stream: {0}")]
    Close(String),

    #[error("Stream is already closed")]
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceMode {
    LowLatency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    F32,
}

/// Stream parameters handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub direction: Direction,
    pub performance_mode: PerformanceMode,
    pub sample_rate: SampleRate,
    pub channels: u16,
    pub format: SampleFormat,
}

impl StreamRequest {
    /// Mono float capture at low latency, the only layout the engine uses
    pub fn mono_input(sample_rate: SampleRate) -> Self {
        Self {
            direction: Direction::Input,
            performance_mode: PerformanceMode::LowLatency,
            sample_rate,
            channels: 1,
            format: SampleFormat::F32,
        }
    }
}

/// Shape of a delivered buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub frames: usize,
    pub channels: u16,
}

impl BufferInfo {
    pub fn total_samples(&self) -> usize {
        self.frames * self.channels as usize
    }
}

/// Value returned from the per-buffer callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Stop,
}

/// Per-buffer callback, invoked on the backend's audio thread
pub type DataCallback = Box<dyn FnMut(&[f32], BufferInfo) -> CallbackAction + Send + 'static>;

/// An open capture stream
pub trait CaptureStream {
    fn start(&mut self) -> Result<(), StreamError>;
    fn stop(&mut self) -> Result<(), StreamError>;
    fn close(&mut self) -> Result<(), StreamError>;
}

/// Something that can open capture streams
pub trait CaptureBackend {
    type Stream: CaptureStream;

    fn open_stream(
        &mut self,
        request: &StreamRequest,
        callback: DataCallback,
    ) -> Result<Self::Stream, StreamError>;
}
