//! Audio capture, lifecycle control and cross-thread handoff

pub mod capture;
#[cfg(feature = "cpal-backend")]
pub mod input;
pub mod mock;
pub mod handoff;
pub mod engine;

pub use capture::{CallbackAction, CaptureBackend, CaptureStream, StreamError, StreamRequest};
#[cfg(feature = "cpal-backend")]
pub use input::CpalBackend;
pub use mock::MockBackend;
pub use handoff::BandHandoff;
pub use engine::{AudioEngine, EngineError, EngineState};
