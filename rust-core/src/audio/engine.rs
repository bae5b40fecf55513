//! Stream lifecycle controller
//!
//! Owns the capture session, the analyzer and the handoff for one engine.
//! `start` opens with bounded retry and only then starts the stream; `stop`
//! always tears down fully and clears published bands.

use super::capture::{
    BufferInfo, CallbackAction, CaptureBackend, CaptureStream, DataCallback, StreamError,
    StreamRequest,
};
use super::handoff::{BandHandoff, HandoffStats};
use crate::config::{ConfigError, EngineConfig, HIGH_BAND_SLOTS, LOW_BAND_SLOTS};
use crate::spectrum::SpectrumAnalyzer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to open capture stream after {attempts} attempt(s): {last}")]
    OpenFailed { attempts: u32, last: StreamError },

    #[error("Capture stream refused to start: {0}")]
    StartFailed(StreamError),

    #[error("Unknown or destroyed engine handle")]
    UnknownHandle,

    #[error("Output buffer has {got} slots, expected {expected}")]
    BufferSize { expected: usize, got: usize },
}

/// Lifecycle state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Closed,
    Opening,
    Running,
}

/// Capture engine: lifecycle controller wrapping the analyzer and handoff
pub struct AudioEngine<B: CaptureBackend> {
    config: EngineConfig,
    backend: B,
    stream: Option<B::Stream>,
    state: EngineState,

    /// Producer-side working state; only the capture callback locks it
    analyzer: Arc<Mutex<SpectrumAnalyzer>>,

    handoff: Arc<BandHandoff>,

    /// Cleared before teardown so late callbacks stop publishing
    running: Arc<AtomicBool>,
}

impl<B: CaptureBackend> AudioEngine<B> {
    /// Create an engine; capture does not start until [`start`](Self::start)
    pub fn new(backend: B, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let analyzer = SpectrumAnalyzer::new(&config);
        let handoff = BandHandoff::new(config.clip_ceiling);

        Ok(Self {
            config,
            backend,
            stream: None,
            state: EngineState::Closed,
            analyzer: Arc::new(Mutex::new(analyzer)),
            handoff: Arc::new(handoff),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Open and start the capture stream
    ///
    /// No-op if already running. Open failures are retried up to
    /// `max_open_attempts` with `retry_delay` between attempts; a start
    /// failure closes the stream and is returned without retry.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.state == EngineState::Running {
            log::debug!("Engine already running, start ignored");
            return Ok(());
        }

        self.state = EngineState::Opening;
        let mut stream = match self.open_with_retry() {
            Ok(stream) => stream,
            Err(e) => {
                self.state = EngineState::Closed;
                log::error!("{}", e);
                return Err(e);
            }
        };

        self.running.store(true, Ordering::Release);
        if let Err(e) = stream.start() {
            self.running.store(false, Ordering::Release);
            if let Err(close_err) = stream.close() {
                log::warn!("Closing stream after failed start: {}", close_err);
            }
            self.state = EngineState::Closed;
            log::error!("Capture stream refused to start: {}", e);
            return Err(EngineError::StartFailed(e));
        }

        self.stream = Some(stream);
        self.state = EngineState::Running;
        log::info!(
            "Capture running at {} Hz",
            self.config.sample_rate.hz()
        );
        Ok(())
    }

    fn open_with_retry(&mut self) -> Result<B::Stream, EngineError> {
        let request = StreamRequest::mono_input(self.config.sample_rate);
        let attempts = self.config.max_open_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let callback = self.make_callback();

            match self.backend.open_stream(&request, callback) {
                Ok(stream) => {
                    log::debug!("Stream opened on attempt {}/{}", attempt, attempts);
                    return Ok(stream);
                }
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "Open attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        attempts,
                        e,
                        self.config.retry_delay
                    );
                    std::thread::sleep(self.config.retry_delay);
                }
                Err(e) => {
                    return Err(EngineError::OpenFailed {
                        attempts: attempt,
                        last: e,
                    });
                }
            }
        }
    }

    /// Per-buffer callback: analyze outside the handoff lock, then publish
    fn make_callback(&self) -> DataCallback {
        let analyzer = Arc::clone(&self.analyzer);
        let handoff = Arc::clone(&self.handoff);
        let running = Arc::clone(&self.running);

        Box::new(move |samples: &[f32], _info: BufferInfo| {
            if !running.load(Ordering::Acquire) {
                return CallbackAction::Stop;
            }

            let mut analyzer = analyzer.lock();
            let pass = analyzer.process(samples);
            handoff.publish(analyzer.bands());

            log::trace!(
                "low[0]={:.3} high[0]={:.3} high peak={:.3}",
                analyzer.bands().low[0],
                analyzer.bands().high[0],
                pass.high_peak
            );
            CallbackAction::Continue
        })
    }

    /// Stop and close the capture stream, then clear the analyzer window and
    /// published bands
    ///
    /// Safe to call at any time; teardown errors are logged, never returned.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);

        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                log::warn!("Stopping capture stream: {}", e);
            }
            if let Err(e) = stream.close() {
                log::warn!("Closing capture stream: {}", e);
            }
            log::info!("Capture stopped");
        }

        self.state = EngineState::Closed;
        self.analyzer.lock().reset();
        self.handoff.reset();
    }

    /// Fill caller buffers with the latest bands
    ///
    /// # Returns
    /// Whether the data is fresh (see [`BandHandoff::consume_into`])
    pub fn poll_bands(
        &self,
        low_out: &mut [f32; LOW_BAND_SLOTS],
        high_out: &mut [f32; HIGH_BAND_SLOTS],
        timeout: Duration,
    ) -> bool {
        self.handoff.consume_into(timeout, low_out, high_out)
    }

    /// [`poll_bands`](Self::poll_bands) with the configured timeout
    pub fn poll(
        &self,
        low_out: &mut [f32; LOW_BAND_SLOTS],
        high_out: &mut [f32; HIGH_BAND_SLOTS],
    ) -> bool {
        self.poll_bands(low_out, high_out, self.config.poll_timeout)
    }

    /// Zero published bands and the freshness flag
    pub fn reset_bands(&self) {
        self.handoff.reset();
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> HandoffStats {
        self.handoff.stats()
    }

    /// The open stream, if running
    pub fn stream(&self) -> Option<&B::Stream> {
        self.stream.as_ref()
    }
}

impl<B: CaptureBackend> Drop for AudioEngine<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::{sine_wave, MockBackend};
    use crate::config::WINDOW_SIZE;
    use std::time::Instant;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn fast_config() -> EngineConfig {
        EngineConfig::default().with_retry(3, Duration::from_millis(5))
    }

    fn high_bin_signal() -> Vec<f32> {
        let config = EngineConfig::default();
        sine_wave(config.bin_frequency_hz(100), 44_100, 0.01, WINDOW_SIZE)
    }

    fn poll(engine: &AudioEngine<MockBackend>, timeout: Duration) -> ([f32; 22], [f32; 1024], bool) {
        let mut low = [0.0; LOW_BAND_SLOTS];
        let mut high = [0.0; HIGH_BAND_SLOTS];
        let fresh = engine.poll_bands(&mut low, &mut high, timeout);
        (low, high, fresh)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = EngineConfig::default().with_clip_ceiling(-1.0);
        let result = AudioEngine::new(MockBackend::new(), config);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_start_opens_mono_float_stream() {
        init_logging();
        let backend = MockBackend::new();
        let mut engine = AudioEngine::new(backend.clone(), fast_config()).unwrap();
        assert_eq!(engine.state(), EngineState::Closed);

        engine.start().unwrap();

        assert!(engine.is_running());
        let calls = backend.calls();
        assert_eq!(calls.opens, 1);
        assert_eq!(calls.starts, 1);
        assert_eq!(
            calls.last_request,
            Some(StreamRequest::mono_input(engine.config().sample_rate))
        );
    }

    #[test]
    fn test_second_start_is_noop() {
        let backend = MockBackend::new();
        let mut engine = AudioEngine::new(backend.clone(), fast_config()).unwrap();

        engine.start().unwrap();
        engine.start().unwrap();

        let calls = backend.calls();
        assert_eq!(calls.opens, 1);
        assert_eq!(calls.starts, 1);
        assert_eq!(backend.open_streams(), 1);
    }

    #[test]
    fn test_open_retried_until_success() {
        init_logging();
        let backend = MockBackend::new();
        backend.fail_opens(2);
        let mut engine = AudioEngine::new(backend.clone(), fast_config()).unwrap();

        engine.start().unwrap();

        let calls = backend.calls();
        assert_eq!(calls.failed_opens, 2);
        assert_eq!(calls.opens, 1);
        assert!(engine.is_running());
    }

    #[test]
    fn test_open_gives_up_after_bound() {
        let backend = MockBackend::new();
        backend.fail_opens(10);
        let config = EngineConfig::default().with_retry(3, Duration::from_millis(20));
        let mut engine = AudioEngine::new(backend.clone(), config).unwrap();

        let start = Instant::now();
        let result = engine.start();
        let elapsed = start.elapsed();

        assert!(matches!(
            result,
            Err(EngineError::OpenFailed { attempts: 3, .. })
        ));
        assert_eq!(backend.calls().failed_opens, 3);
        assert_eq!(engine.state(), EngineState::Closed);
        // Two delays between three attempts
        assert!(elapsed >= Duration::from_millis(40));
    }

    #[test]
    fn test_start_failure_closes_without_retry() {
        let backend = MockBackend::new();
        backend.fail_start(true);
        let mut engine = AudioEngine::new(backend.clone(), fast_config()).unwrap();

        let result = engine.start();

        assert!(matches!(result, Err(EngineError::StartFailed(_))));
        let calls = backend.calls();
        assert_eq!(calls.opens, 1);
        assert_eq!(calls.starts, 1);
        assert_eq!(calls.closes, 1);
        assert_eq!(backend.open_streams(), 0);
        assert!(engine.stream().is_none());
        assert_eq!(engine.state(), EngineState::Closed);

        // Caller may retry later
        backend.fail_start(false);
        engine.start().unwrap();
        assert!(engine.is_running());
    }

    #[test]
    fn test_callback_publishes_bands() {
        let backend = MockBackend::new();
        let feed = backend.feed();
        let mut engine = AudioEngine::new(backend, fast_config()).unwrap();
        engine.start().unwrap();

        assert_eq!(feed.push(&high_bin_signal()), Some(CallbackAction::Continue));

        let (low, high, fresh) = poll(&engine, Duration::from_millis(50));
        assert!(fresh);
        assert!((high[93] - 5.0).abs() < 0.05);
        assert!(low.iter().all(|&m| m < 0.01));

        let (_, high_again, fresh) = poll(&engine, Duration::from_millis(10));
        assert!(!fresh);
        assert_eq!(high_again, high);
        assert_eq!(engine.stats().published, 1);
    }

    #[test]
    fn test_stop_tears_down_and_resets() {
        let backend = MockBackend::new();
        let feed = backend.feed();
        let mut engine = AudioEngine::new(backend.clone(), fast_config()).unwrap();
        engine.start().unwrap();
        feed.push(&high_bin_signal());

        engine.stop();

        let calls = backend.calls();
        assert_eq!(calls.stops, 1);
        assert_eq!(calls.closes, 1);
        assert_eq!(engine.state(), EngineState::Closed);

        let (low, high, fresh) = poll(&engine, Duration::from_millis(5));
        assert!(!fresh);
        assert!(low.iter().chain(high.iter()).all(|&m| m == 0.0));

        // Stream is gone, nothing reaches the analyzer any more
        assert_eq!(feed.push(&high_bin_signal()), None);
    }

    #[test]
    fn test_stop_is_idempotent_and_swallows_errors() {
        let backend = MockBackend::new();
        let mut engine = AudioEngine::new(backend.clone(), fast_config()).unwrap();

        engine.stop();
        assert_eq!(backend.calls().stops, 0);

        engine.start().unwrap();
        backend.fail_teardown(true);
        engine.stop();
        engine.stop();

        let calls = backend.calls();
        assert_eq!(calls.stops, 1);
        assert_eq!(calls.closes, 1);
        assert_eq!(engine.state(), EngineState::Closed);
    }

    #[test]
    fn test_restart_after_stop() {
        let backend = MockBackend::new();
        let feed = backend.feed();
        let mut engine = AudioEngine::new(backend.clone(), fast_config()).unwrap();

        engine.start().unwrap();
        engine.stop();
        engine.start().unwrap();

        assert_eq!(backend.calls().opens, 2);
        assert_eq!(backend.open_streams(), 1);
        assert_eq!(feed.push(&high_bin_signal()), Some(CallbackAction::Continue));
        let (_, _, fresh) = poll(&engine, Duration::from_millis(50));
        assert!(fresh);
    }

    #[test]
    fn test_restart_starts_from_clean_window() {
        let backend = MockBackend::new();
        let feed = backend.feed();
        let mut engine = AudioEngine::new(backend, fast_config()).unwrap();

        engine.start().unwrap();
        feed.push(&high_bin_signal());
        engine.stop();
        engine.start().unwrap();

        // A short buffer only overwrites the head of the window
        feed.push(&[0.0; 256]);
        let (low, high, fresh) = poll(&engine, Duration::from_millis(50));

        assert!(fresh);
        assert!(high[93] < 0.01, "high[93] = {}", high[93]);
        assert!(low.iter().chain(high.iter()).all(|&m| m < 0.01));
    }

    #[test]
    fn test_interleaved_buffer_uses_first_window() {
        let backend = MockBackend::new();
        let feed = backend.feed();
        let mut engine = AudioEngine::new(backend, fast_config()).unwrap();
        engine.start().unwrap();

        // Two channels worth of samples; everything past the window is dropped
        let mut samples = high_bin_signal();
        samples.extend(std::iter::repeat(0.9).take(WINDOW_SIZE));
        assert_eq!(feed.push_interleaved(&samples, 2), Some(CallbackAction::Continue));

        let (low, high, fresh) = poll(&engine, Duration::from_millis(50));
        assert!(fresh);
        assert!((high[93] - 5.0).abs() < 0.05);
        assert!(low.iter().all(|&m| m < 0.01));
    }

    #[test]
    fn test_late_callback_after_stop_does_not_publish() {
        let backend = MockBackend::new();
        let engine = AudioEngine::new(backend, fast_config()).unwrap();
        let mut callback = engine.make_callback();

        let info = BufferInfo { frames: WINDOW_SIZE, channels: 1 };
        assert_eq!(callback(&high_bin_signal(), info), CallbackAction::Stop);
        assert_eq!(engine.stats().published, 0);
    }

    #[test]
    fn test_poll_times_out_without_capture() {
        let engine = AudioEngine::new(MockBackend::new(), fast_config()).unwrap();

        let start = Instant::now();
        let (low, high, fresh) = poll(&engine, Duration::from_millis(20));

        assert!(!fresh);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(low.iter().chain(high.iter()).all(|&m| m == 0.0));
    }

    #[test]
    fn test_poll_uses_configured_timeout() {
        let config = fast_config().with_poll_timeout(Duration::from_millis(15));
        let engine = AudioEngine::new(MockBackend::new(), config).unwrap();
        let mut low = [0.0; LOW_BAND_SLOTS];
        let mut high = [0.0; HIGH_BAND_SLOTS];

        let start = Instant::now();
        assert!(!engine.poll(&mut low, &mut high));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_drop_closes_stream() {
        let backend = MockBackend::new();
        {
            let mut engine = AudioEngine::new(backend.clone(), fast_config()).unwrap();
            engine.start().unwrap();
        }
        assert_eq!(backend.open_streams(), 0);
    }
}
