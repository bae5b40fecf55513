//! Consumer-side band summaries
//!
//! Reduces a polled frame to the two numbers a visual actually draws: the
//! average low-band level and the peak high-band level, with exponential
//! smoothing between polls.

/// Default weight given to the previous smoothed value
pub const DEFAULT_SMOOTHING: f32 = 0.7;

/// Aggregated levels of one polled frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandLevels {
    /// Mean of |x| over the low band
    pub low_average: f32,

    /// Max of |x| over the high band
    pub high_peak: f32,
}

impl BandLevels {
    /// Summarize polled bands
    ///
    /// Non-finite values and values above `ceiling` are ignored.
    pub fn from_bands(low: &[f32], high: &[f32], ceiling: f32) -> Self {
        let usable = |x: f32| x.is_finite() && x.abs() <= ceiling;

        let (sum, count) = low
            .iter()
            .filter(|&&x| usable(x))
            .fold((0.0f32, 0usize), |(sum, n), x| (sum + x.abs(), n + 1));
        let low_average = if count > 0 { sum / count as f32 } else { 0.0 };

        let high_peak = high
            .iter()
            .filter(|&&x| usable(x))
            .map(|x| x.abs())
            .fold(0.0f32, f32::max);

        Self {
            low_average,
            high_peak,
        }
    }
}

/// Exponential smoother for [`BandLevels`]
#[derive(Debug, Clone)]
pub struct LevelSmoother {
    factor: f32,
    current: BandLevels,
}

impl Default for LevelSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

impl LevelSmoother {
    /// # Arguments
    /// * `factor` - Weight of the previous value, clamped to `[0, 1]`
    pub fn new(factor: f32) -> Self {
        Self {
            factor: factor.clamp(0.0, 1.0),
            current: BandLevels::default(),
        }
    }

    /// Fold in a new observation and return the smoothed levels
    pub fn update(&mut self, levels: BandLevels) -> BandLevels {
        let factor = self.factor;
        let blend = |prev: f32, next: f32| factor * prev + (1.0 - factor) * next;
        self.current = BandLevels {
            low_average: blend(self.current.low_average, levels.low_average),
            high_peak: blend(self.current.high_peak, levels.high_peak),
        };
        self.current
    }

    pub fn current(&self) -> BandLevels {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = BandLevels::default();
    }
}
