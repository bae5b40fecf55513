//! Engine configuration
//!
//! The band layout is fixed; everything that drifted between deployments
//! (sample rate, gain, sensitivities, clip ceiling, retry policy) lives in
//! [`EngineConfig`] so a build selects a profile instead of editing constants.

use std::time::Duration;
use thiserror::Error;

/// Analysis window size in samples
pub const WINDOW_SIZE: usize = 2048;

/// Number of complex bins produced by the real forward transform
pub const SPECTRUM_BINS: usize = WINDOW_SIZE / 2 + 1;

/// Low-band output slots
pub const LOW_BAND_SLOTS: usize = 22;

/// High-band output slots
pub const HIGH_BAND_SLOTS: usize = 1024;

/// First bin classified into the low band
pub const LOW_BAND_START: usize = 2;

/// End (exclusive) of the low-band bin range
pub const LOW_BAND_END: usize = 6;

/// First bin classified into the high band
pub const HIGH_BAND_START: usize = 7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be finite and non-negative (got {value})")]
    InvalidFactor { name: &'static str, value: f32 },

    #[error("clip ceiling must be finite and positive (got {0})")]
    InvalidClipCeiling(f32),

    #[error("at least one stream open attempt is required")]
    NoOpenAttempts,

    #[error("unsupported sample rate: {0} Hz (expected 44100 or 48000)")]
    UnsupportedSampleRate(u32),
}

/// Capture sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    Hz44100,
    Hz48000,
}

impl SampleRate {
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44_100,
            SampleRate::Hz48000 => 48_000,
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = ConfigError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        match hz {
            44_100 => Ok(SampleRate::Hz44100),
            48_000 => Ok(SampleRate::Hz48000),
            other => Err(ConfigError::UnsupportedSampleRate(other)),
        }
    }
}

/// Named constant sets for known deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigProfile {
    /// Phone microphone at 44.1 kHz
    Mobile,
    /// Desktop interface at 48 kHz
    Desktop,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Capture sample rate
    pub sample_rate: SampleRate,

    /// Gain applied to raw samples before the transform
    pub gain: f32,

    /// Multiplier for low-band magnitudes
    pub low_sensitivity: f32,

    /// Multiplier for high-band magnitudes
    pub high_sensitivity: f32,

    /// Hard ceiling for every published magnitude
    pub clip_ceiling: f32,

    /// Stream open attempts before `start` gives up
    pub max_open_attempts: u32,

    /// Delay between open attempts
    pub retry_delay: Duration,

    /// Default wait used by consumers that do not pass their own timeout
    pub poll_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_profile(ConfigProfile::Mobile)
    }
}

impl EngineConfig {
    pub fn from_profile(profile: ConfigProfile) -> Self {
        let sample_rate = match profile {
            ConfigProfile::Mobile => SampleRate::Hz44100,
            ConfigProfile::Desktop => SampleRate::Hz48000,
        };

        Self {
            sample_rate,
            gain: 20.0,
            low_sensitivity: 200.0,
            high_sensitivity: 50.0,
            clip_ceiling: 1000.0,
            max_open_attempts: 3,
            retry_delay: Duration::from_millis(500),
            poll_timeout: Duration::from_millis(200),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: SampleRate) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_sensitivity(mut self, low: f32, high: f32) -> Self {
        self.low_sensitivity = low;
        self.high_sensitivity = high;
        self
    }

    pub fn with_clip_ceiling(mut self, clip_ceiling: f32) -> Self {
        self.clip_ceiling = clip_ceiling;
        self
    }

    pub fn with_retry(mut self, max_open_attempts: u32, retry_delay: Duration) -> Self {
        self.max_open_attempts = max_open_attempts;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Check every tunable before an engine is built from this config
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("gain", self.gain),
            ("low sensitivity", self.low_sensitivity),
            ("high sensitivity", self.high_sensitivity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidFactor { name, value });
            }
        }

        if !self.clip_ceiling.is_finite() || self.clip_ceiling <= 0.0 {
            return Err(ConfigError::InvalidClipCeiling(self.clip_ceiling));
        }

        if self.max_open_attempts == 0 {
            return Err(ConfigError::NoOpenAttempts);
        }

        Ok(())
    }

    /// Width of one transform bin in Hz
    pub fn bin_width_hz(&self) -> f64 {
        self.sample_rate.hz() as f64 / WINDOW_SIZE as f64
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency_hz(&self, bin: usize) -> f64 {
        bin as f64 * self.bin_width_hz()
    }

    /// Nearest bin for a frequency in Hz
    pub fn bin_for_frequency(&self, hz: f64) -> usize {
        (hz / self.bin_width_hz()).round().max(0.0) as usize
    }

    /// Worst-case time spent in `start` when every open attempt fails
    pub fn worst_case_open_delay(&self) -> Duration {
        self.retry_delay * self.max_open_attempts.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mobile_profile() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate.hz(), 44_100);
        assert_eq!(config.gain, 20.0);
        assert_eq!(config.low_sensitivity, 200.0);
        assert_eq!(config.high_sensitivity, 50.0);
        assert_eq!(config.clip_ceiling, 1000.0);
        assert_eq!(config.max_open_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.poll_timeout, Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_desktop_profile() {
        let config = EngineConfig::from_profile(ConfigProfile::Desktop);
        assert_eq!(config.sample_rate, SampleRate::Hz48000);
        assert!((config.bin_width_hz() - 23.4375).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = EngineConfig::default().with_gain(f32::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFactor { name: "gain", .. })
        ));

        let config = EngineConfig::default().with_sensitivity(-1.0, 50.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFactor { .. })));

        let config = EngineConfig::default().with_clip_ceiling(0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidClipCeiling(0.0)));

        let config = EngineConfig::default().with_retry(0, Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::NoOpenAttempts));
    }

    #[test]
    fn test_sample_rate_conversion() {
        assert_eq!(SampleRate::try_from(48_000u32), Ok(SampleRate::Hz48000));
        assert_eq!(
            SampleRate::try_from(22_050u32),
            Err(ConfigError::UnsupportedSampleRate(22_050))
        );
    }

    #[test]
    fn test_bin_frequency_mapping() {
        let config = EngineConfig::default();
        let hz = config.bin_frequency_hz(100);
        assert_eq!(config.bin_for_frequency(hz), 100);
        assert_eq!(config.bin_for_frequency(0.0), 0);
    }

    #[test]
    fn test_worst_case_open_delay() {
        let config = EngineConfig::default();
        assert_eq!(config.worst_case_open_delay(), Duration::from_millis(1000));
    }
}
