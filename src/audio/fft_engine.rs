use crate::audio::constants::{gain_to_db_floored, MAX_FFT_ORDER, MIN_FFT_ORDER, SPECTRUM_FLOOR_DB};
use apodize::blackman_iter;
use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Power-of-two transform size, `2^order` samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FftOrder(u32);

impl FftOrder {
    pub const DEFAULT: Self = Self(MIN_FFT_ORDER);

    /// Clamped into `MIN_FFT_ORDER..=MAX_FFT_ORDER`
    pub fn new(order: u32) -> Self {
        Self(order.clamp(MIN_FFT_ORDER, MAX_FFT_ORDER))
    }

    pub fn order(self) -> u32 {
        self.0
    }

    pub fn size(self) -> usize {
        1 << self.0
    }
}

impl Default for FftOrder {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Transform size requested from outside the display thread. The poller
/// applies it on its next tick.
#[derive(Debug, Clone)]
pub struct SharedFftOrder(Arc<AtomicU32>);

impl SharedFftOrder {
    pub fn new(order: FftOrder) -> Self {
        Self(Arc::new(AtomicU32::new(order.order())))
    }

    pub fn store(&self, order: FftOrder) {
        self.0.store(order.order(), Ordering::Relaxed);
    }

    pub fn load(&self) -> FftOrder {
        FftOrder::new(self.0.load(Ordering::Relaxed))
    }
}

impl Default for SharedFftOrder {
    fn default() -> Self {
        Self::new(FftOrder::DEFAULT)
    }
}

/// Windowed, magnitude-only forward FFT producing dB bins
pub struct FftEngine {
    fft: Arc<dyn RealToComplex<f32>>,

    // Buffers
    input_buffer: Vec<f32>,        // Windowed samples
    output_buffer: Vec<Complex32>, // FFT output (size / 2 + 1 bins)
    scratch: Vec<Complex32>,

    // Blackman window (precomputed)
    window: Vec<f32>,

    order: FftOrder,
}

impl FftEngine {
    pub fn new(order: FftOrder) -> Self {
        let size = order.size();

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);

        let window: Vec<f32> = blackman_iter(size).map(|w| w as f32).collect();

        let input_buffer = fft.make_input_vec();
        let output_buffer = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        Self {
            fft,
            input_buffer,
            output_buffer,
            scratch,
            window,
            order,
        }
    }

    pub fn order(&self) -> FftOrder {
        self.order
    }

    pub fn size(&self) -> usize {
        self.order.size()
    }

    /// Number of bins written by [`process`](Self::process)
    pub fn num_bins(&self) -> usize {
        self.size() / 2
    }

    /// Window `samples`, transform them and write `size / 2` dB values into
    /// `magnitudes_db`. Each bin is normalized by half the transform size and
    /// floored at the analyser floor. Non-finite bins stay non-finite.
    ///
    /// Returns `false` without touching `magnitudes_db` if the transform fails.
    pub fn process(&mut self, samples: &[f32], magnitudes_db: &mut [f32]) -> bool {
        for ((input, &sample), &w) in self
            .input_buffer
            .iter_mut()
            .zip(samples.iter())
            .zip(self.window.iter())
        {
            *input = sample * w;
        }

        if self
            .fft
            .process_with_scratch(
                &mut self.input_buffer,
                &mut self.output_buffer,
                &mut self.scratch,
            )
            .is_err()
        {
            return false;
        }

        let normalization = 2.0 / self.size() as f32;
        for (db, bin) in magnitudes_db.iter_mut().zip(self.output_buffer.iter()) {
            *db = gain_to_db_floored(bin.norm() * normalization, SPECTRUM_FLOOR_DB);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_clamped() {
        assert_eq!(FftOrder::new(3).order(), MIN_FFT_ORDER);
        assert_eq!(FftOrder::new(40).order(), MAX_FFT_ORDER);
        assert_eq!(FftOrder::new(12).size(), 4096);
        assert_eq!(FftOrder::default().size(), 2048);
    }

    #[test]
    fn shared_order_is_seen_by_every_clone() {
        let order = SharedFftOrder::default();
        let display_side = order.clone();
        assert_eq!(display_side.load(), FftOrder::DEFAULT);

        order.store(FftOrder::new(14));
        assert_eq!(display_side.load().size(), 16384);
    }

    #[test]
    fn silence_sits_on_the_floor() {
        let mut engine = FftEngine::new(FftOrder::DEFAULT);
        let samples = vec![0.0; engine.size()];
        let mut bins = vec![0.0; engine.num_bins()];
        assert!(engine.process(&samples, &mut bins));
        assert!(bins.iter().all(|&db| db == SPECTRUM_FLOOR_DB));
    }

    #[test]
    fn bin_centred_sine_peaks_in_its_bin() {
        let mut engine = FftEngine::new(FftOrder::new(12));
        let size = engine.size();
        let bin = 100;
        let samples: Vec<f32> = (0..size)
            .map(|n| (2.0 * std::f32::consts::PI * bin as f32 * n as f32 / size as f32).sin())
            .collect();

        let mut bins = vec![0.0; engine.num_bins()];
        assert!(engine.process(&samples, &mut bins));

        let (peak, _) = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(peak, bin);
        // Window coherent gain puts a full scale sine a few dB below 0
        assert!((-10.0..-6.0).contains(&bins[bin]), "peak level {}", bins[bin]);
    }
}
