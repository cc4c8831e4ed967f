/// Audio processing constants and helper functions
/// Shared by the audio thread, the display context and the parameter layout

/// Frequency range constants
pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 20000.0;

/// Default band frequencies (low, mid, high)
pub const DEFAULT_FREQUENCIES: [f32; NUM_BANDS] = [20.0, 1000.0, 20000.0];

/// Band gain range
pub const GAIN_MIN_DB: f32 = -24.0;
pub const GAIN_MAX_DB: f32 = 24.0;

/// Number of bands in every channel chain, processed in index order
pub const NUM_BANDS: usize = 3;

/// Second-order sections per band (48 dB/oct = 4 sections)
pub const MAX_STAGES: usize = 4;

/// Quality factor used for every peak band
pub const PEAK_Q: f32 = 1.0;

/// Cutoffs are kept just below Nyquist so the bilinear prewarp stays finite
pub const MAX_CUTOFF_RATIO: f32 = 0.499;

/// Slots in the audio -> display block queue and in the analysis frame queue
pub const RING_BUFFER_CAPACITY: usize = 30;

/// Analyser floor used in place of negative infinity
pub const SPECTRUM_FLOOR_DB: f32 = -48.0;

/// Floor for the response curve, well below anything a 3 band EQ can reach
pub const RESPONSE_FLOOR_DB: f32 = -100.0;

/// Smallest and largest FFT orders (2^11 ..= 2^15)
pub const MIN_FFT_ORDER: u32 = 11;
pub const MAX_FFT_ORDER: u32 = 15;

/// Blocks handed to the display thread never exceed the smallest analysis window
pub const MAX_BLOCK_SIZE: usize = 1 << MIN_FFT_ORDER;

/// Display polling period
pub const DISPLAY_POLL_INTERVAL_MS: u64 = 30;

/// Points evaluated along the response curve
pub const RESPONSE_CURVE_POINTS: usize = 512;

// === HELPER FUNCTIONS ===

/// Convert frequency to logarithmic position (0.0 to 1.0)
pub fn freq_to_log_position(freq: f32) -> f32 {
    (freq / MIN_FREQUENCY).log10() / (MAX_FREQUENCY / MIN_FREQUENCY).log10()
}

/// Convert logarithmic position (0.0 to 1.0) back to frequency
pub fn log_position_to_freq(position: f32) -> f32 {
    MIN_FREQUENCY * (MAX_FREQUENCY / MIN_FREQUENCY).powf(position)
}

/// Linear gain to dB with a floor standing in for negative infinity.
/// Zero and negative gains map to the floor. NaN and infinity pass through
/// so callers can drop them instead of drawing them.
pub fn gain_to_db_floored(gain: f32, floor_db: f32) -> f32 {
    if gain.is_nan() {
        gain
    } else if gain > 0.0 {
        (20.0 * libm::log10f(gain)).max(floor_db)
    } else {
        floor_db
    }
}
