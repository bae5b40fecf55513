//! Bandscope - Real-Time Audio Band Analyzer Core
//!
//! Captures a mono input stream, transforms each buffer and publishes a small
//! low-frequency band and a large high-frequency band to a polling consumer.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![allow(non_local_definitions)]

pub mod audio;
pub mod config;
pub mod registry;
pub mod spectrum;
pub mod summary;
#[cfg(feature = "python")]
pub mod python_bindings;

pub use audio::{AudioEngine, BandHandoff, EngineError};
pub use config::{ConfigProfile, EngineConfig, SampleRate};
pub use registry::{EngineHandle, EngineRegistry};
pub use spectrum::{BandFrame, SpectrumAnalyzer};
pub use summary::{BandLevels, LevelSmoother};

/// Route `log` output through env_logger; safe to call more than once
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
