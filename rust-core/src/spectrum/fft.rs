//! FFT engine using realfft for real-valued signals
//!
//! All buffers are allocated once at construction so `process` is safe to
//! call from the audio callback.

use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// FFT engine for real-valued windows
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f32>>,

    /// Transform input; realfft uses it as scratch, so it is refilled every pass
    input_buffer: Vec<f32>,

    /// Complex spectrum, `fft_size / 2 + 1` bins
    output_buffer: Vec<Complex<f32>>,

    scratch: Vec<Complex<f32>>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (number of samples)
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();
        let scratch = r2c.make_scratch_vec();

        Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
            scratch,
        }
    }

    /// Run the forward transform on a window
    ///
    /// # Arguments
    /// * `window` - Input samples (zero-padded if shorter than fft_size, truncated if longer)
    ///
    /// # Returns
    /// Complex spectrum X[k] for k = 0..=fft_size/2
    pub fn process(&mut self, window: &[f32]) -> &[Complex<f32>] {
        let copy_len = window.len().min(self.fft_size);
        self.input_buffer[..copy_len].copy_from_slice(&window[..copy_len]);
        if copy_len < self.fft_size {
            self.input_buffer[copy_len..].fill(0.0);
        }

        if let Err(e) = self.r2c.process_with_scratch(
            &mut self.input_buffer,
            &mut self.output_buffer,
            &mut self.scratch,
        ) {
            // Buffer lengths come from the plan
            log::error!("FFT processing failed: {}", e);
            self.output_buffer.fill(Complex::new(0.0, 0.0));
        }

        &self.output_buffer
    }

    /// Get number of frequency bins (fft_size/2 + 1 for real FFT)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Convert bin index to frequency in Hz
    pub fn bin_to_hz(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.fft_size as f64
    }
}
