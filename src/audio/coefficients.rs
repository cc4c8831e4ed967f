//! Filter coefficient design.
//!
//! Every function here is a pure function of a band's settings and the sample
//! rate. Peak bands get a single RBJ peaking section, low/high pass bands get a
//! Butterworth cascade of `slope / 12` second-order sections.

use crate::audio::constants::{MAX_STAGES, PEAK_Q};
use crate::audio::settings::{BandSettings, BandType};
use nih_plug::util;
use realfft::num_complex::Complex64;
use std::f64::consts::PI;

/// One second-order section, normalized so that `a0 == 1`
///
/// Difference equation: `y = b0*x + b1*x1 + b2*x2 - a1*y1 - a2*y2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for FilterCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FilterCoefficients {
    /// Passes the signal through unchanged
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv_a0 = 1.0 / a0;
        Self {
            b0: (b0 * inv_a0) as f32,
            b1: (b1 * inv_a0) as f32,
            b2: (b2 * inv_a0) as f32,
            a1: (a1 * inv_a0) as f32,
            a2: (a2 * inv_a0) as f32,
        }
    }

    /// Magnitude of the transfer function at `frequency`, evaluated on the unit circle
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * PI * frequency / sample_rate;
        // z^-1 and z^-2 on the unit circle
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;

        let numerator =
            Complex64::new(self.b0 as f64, 0.0) + z1 * self.b1 as f64 + z2 * self.b2 as f64;
        let denominator = Complex64::new(1.0, 0.0) + z1 * self.a1 as f64 + z2 * self.a2 as f64;

        numerator.norm() / denominator.norm()
    }

    /// Both poles strictly inside the unit circle (stability triangle)
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

/// Up to [`MAX_STAGES`] sections, ordered from least to most resonant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeCoefficients {
    sections: [FilterCoefficients; MAX_STAGES],
    len: usize,
}

impl CascadeCoefficients {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[FilterCoefficients] {
        &self.sections[..self.len]
    }
}

/// Whether a Butterworth cascade keeps the lows or the highs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    LowPass,
    HighPass,
}

/// Peaking EQ section (RBJ cookbook) with a linear gain factor
pub fn design_peak(sample_rate: f32, frequency: f32, q: f32, gain_factor: f32) -> FilterCoefficients {
    let a = (gain_factor as f64).sqrt();
    let omega = 2.0 * PI * frequency as f64 / sample_rate as f64;
    let alpha = omega.sin() / (2.0 * q as f64);
    let c2 = -2.0 * omega.cos();

    FilterCoefficients::normalized(
        1.0 + alpha * a,
        c2,
        1.0 - alpha * a,
        1.0 + alpha / a,
        c2,
        1.0 - alpha / a,
    )
}

/// Even-order Butterworth response factored into second-order sections.
///
/// Section `i` gets `Q = 1 / (2 cos((2i + 1) pi / 2N))` and is mapped to the z
/// plane with a prewarped bilinear transform, so the cascade is exactly -3 dB
/// at `cutoff`.
pub fn design_butterworth(
    kind: PassKind,
    cutoff: f32,
    sample_rate: f32,
    order: usize,
) -> CascadeCoefficients {
    nih_plug::nih_debug_assert!(order % 2 == 0, "Butterworth order must be even");
    let num_sections = (order / 2).clamp(1, MAX_STAGES);
    let order = (num_sections * 2) as f64;

    let k = (PI * cutoff as f64 / sample_rate as f64).tan();
    let k2 = k * k;

    let mut sections = [FilterCoefficients::IDENTITY; MAX_STAGES];
    for (i, section) in sections.iter_mut().take(num_sections).enumerate() {
        let q = 1.0 / (2.0 * ((2.0 * i as f64 + 1.0) * PI / (2.0 * order)).cos());
        let a0 = 1.0 + k / q + k2;
        let a1 = 2.0 * (k2 - 1.0);
        let a2 = 1.0 - k / q + k2;

        *section = match kind {
            PassKind::LowPass => FilterCoefficients::normalized(k2, 2.0 * k2, k2, a0, a1, a2),
            PassKind::HighPass => FilterCoefficients::normalized(1.0, -2.0, 1.0, a0, a1, a2),
        };
    }

    CascadeCoefficients {
        sections,
        len: num_sections,
    }
}

/// Peak band design: fixed Q of 1.0, gain converted from dB
pub fn make_peak_filter(band: &BandSettings, sample_rate: f32) -> FilterCoefficients {
    design_peak(
        sample_rate,
        band.frequency,
        PEAK_Q,
        util::db_to_gain(band.gain),
    )
}

pub fn make_low_pass_filter(band: &BandSettings, sample_rate: f32) -> CascadeCoefficients {
    design_butterworth(PassKind::LowPass, band.frequency, sample_rate, band.slope.order())
}

pub fn make_high_pass_filter(band: &BandSettings, sample_rate: f32) -> CascadeCoefficients {
    design_butterworth(PassKind::HighPass, band.frequency, sample_rate, band.slope.order())
}

/// Coefficients for one band, ready to install into a [`BandFilterCascade`]
///
/// [`BandFilterCascade`]: crate::audio::filter_chain::BandFilterCascade
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandDesign {
    Peak(FilterCoefficients),
    Pass(CascadeCoefficients),
}

impl BandDesign {
    /// Clamps the band frequency below Nyquist, then designs for the band's type
    pub fn for_band(band: &BandSettings, sample_rate: f32) -> Self {
        let band = BandSettings {
            frequency: band.frequency_for(sample_rate),
            ..*band
        };

        match band.band_type {
            BandType::Peak => Self::Peak(make_peak_filter(&band, sample_rate)),
            BandType::LowPass => Self::Pass(make_low_pass_filter(&band, sample_rate)),
            BandType::HighPass => Self::Pass(make_high_pass_filter(&band, sample_rate)),
        }
    }
}
