//! Mock capture backend for testing without hardware.
//!
//! [`MockBackend`] records every lifecycle call, can be scripted to fail
//! opens or starts, and hands out a [`MockFeed`] that invokes the registered
//! callback the way a device thread would.

use super::capture::{
    BufferInfo, CallbackAction, CaptureBackend, CaptureStream, DataCallback, StreamError,
    StreamRequest,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Lifecycle calls observed by the mock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub opens: u32,
    pub failed_opens: u32,
    pub starts: u32,
    pub stops: u32,
    pub closes: u32,
    pub last_request: Option<StreamRequest>,
}

#[derive(Default)]
struct MockState {
    calls: MockCalls,
    fail_next_opens: u32,
    fail_start: bool,
    fail_teardown: bool,
    callback: Option<DataCallback>,
    running: bool,
}

/// Scriptable capture backend
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` open attempts
    pub fn fail_opens(&self, count: u32) -> &Self {
        self.state.lock().fail_next_opens = count;
        self
    }

    /// Fail every start request
    pub fn fail_start(&self, fail: bool) -> &Self {
        self.state.lock().fail_start = fail;
        self
    }

    /// Fail stop and close requests
    pub fn fail_teardown(&self, fail: bool) -> &Self {
        self.state.lock().fail_teardown = fail;
        self
    }

    pub fn calls(&self) -> MockCalls {
        self.state.lock().calls.clone()
    }

    /// Streams currently open (opened and not yet closed)
    pub fn open_streams(&self) -> u32 {
        let state = self.state.lock();
        state.calls.opens - state.calls.closes
    }

    /// Handle that delivers buffers to the registered callback
    pub fn feed(&self) -> MockFeed {
        MockFeed {
            state: Arc::clone(&self.state),
        }
    }
}

impl CaptureBackend for MockBackend {
    type Stream = MockStream;

    fn open_stream(
        &mut self,
        request: &StreamRequest,
        callback: DataCallback,
    ) -> Result<MockStream, StreamError> {
        let mut state = self.state.lock();
        state.calls.last_request = Some(*request);

        if state.fail_next_opens > 0 {
            state.fail_next_opens -= 1;
            state.calls.failed_opens += 1;
            return Err(StreamError::Open("mock device busy".to_string()));
        }

        state.calls.opens += 1;
        state.callback = Some(callback);

        Ok(MockStream {
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

/// Stream handed out by [`MockBackend`]
pub struct MockStream {
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl CaptureStream for MockStream {
    fn start(&mut self) -> Result<(), StreamError> {
        let mut state = self.state.lock();
        state.calls.starts += 1;
        if state.fail_start {
            return Err(StreamError::Start("mock start refused".to_string()));
        }
        state.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        let mut state = self.state.lock();
        state.calls.stops += 1;
        state.running = false;
        if state.fail_teardown {
            return Err(StreamError::Stop("mock stop refused".to_string()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::Disconnected);
        }
        self.closed = true;

        let mut state = self.state.lock();
        state.calls.closes += 1;
        state.running = false;
        state.callback = None;
        if state.fail_teardown {
            return Err(StreamError::Close("mock close refused".to_string()));
        }
        Ok(())
    }
}

/// Drives the registered callback like a device thread
#[derive(Clone)]
pub struct MockFeed {
    state: Arc<Mutex<MockState>>,
}

impl MockFeed {
    /// Deliver one mono buffer
    ///
    /// # Returns
    /// The callback's answer, or `None` when no started stream is registered
    pub fn push(&self, samples: &[f32]) -> Option<CallbackAction> {
        self.push_interleaved(samples, 1)
    }

    /// Deliver one interleaved buffer with `channels` channels
    pub fn push_interleaved(&self, samples: &[f32], channels: u16) -> Option<CallbackAction> {
        // Take the callback out so it runs without the mock lock held,
        // like a real device thread would
        let mut callback = {
            let mut state = self.state.lock();
            if !state.running {
                return None;
            }
            state.callback.take()?
        };

        let info = BufferInfo {
            frames: samples.len() / channels.max(1) as usize,
            channels,
        };
        let action = callback(samples, info);

        let mut state = self.state.lock();
        if state.running && state.callback.is_none() {
            state.callback = Some(callback);
        }
        Some(action)
    }
}

/// Sine wave at `frequency` Hz
pub fn sine_wave(frequency: f64, sample_rate: u32, amplitude: f32, len: usize) -> Vec<f32> {
    let sample_rate = f64::from(sample_rate);
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * frequency * n as f64 / sample_rate;
            (phase.sin() * f64::from(amplitude)) as f32
        })
        .collect()
}

/// Constant signal
pub fn dc_signal(value: f32, len: usize) -> Vec<f32> {
    vec![value; len]
}
