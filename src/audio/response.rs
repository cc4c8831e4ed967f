use crate::audio::constants::{gain_to_db_floored, log_position_to_freq, RESPONSE_FLOOR_DB};
use crate::audio::filter_chain::ChannelFilterChain;

/// A point on a display polyline. `position` runs from 0.0 at 20 Hz to 1.0 at
/// 20 kHz on a logarithmic axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub position: f32,
    pub frequency: f32,
    pub db: f32,
}

/// Combined response of every active stage in `chain` at `frequency`, in dB.
/// NaN when the chain does not evaluate to a number there.
pub fn evaluate_response_db(chain: &ChannelFilterChain, frequency: f32, sample_rate: f32) -> f32 {
    let magnitude = chain.magnitude_at(frequency as f64, sample_rate as f64);
    gain_to_db_floored(magnitude as f32, RESPONSE_FLOOR_DB)
}

/// Sample the response at `num_points` log-spaced frequencies between 20 Hz and
/// 20 kHz. Points that do not evaluate to a finite value are left out.
pub fn response_curve(
    chain: &ChannelFilterChain,
    sample_rate: f32,
    num_points: usize,
) -> Vec<CurvePoint> {
    let last = num_points.saturating_sub(1).max(1) as f32;
    (0..num_points)
        .filter_map(|i| {
            let position = i as f32 / last;
            let frequency = log_position_to_freq(position);
            let db = evaluate_response_db(chain, frequency, sample_rate);
            db.is_finite().then_some(CurvePoint {
                position,
                frequency,
                db,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::coefficients::{BandDesign, FilterCoefficients};
    use crate::audio::settings::{BandSettings, BandType, ChainSettings, Slope};

    const SR: f32 = 48000.0;

    fn single_peak(gain: f32) -> ChannelFilterChain {
        let mut settings = ChainSettings::default();
        settings.bands[1] = BandSettings::new(1000.0, gain, Slope::Slope12, BandType::Peak);
        ChannelFilterChain::from_settings(&settings, SR)
    }

    #[test]
    fn flat_peak_is_zero_db_everywhere() {
        let chain = single_peak(0.0);
        for point in response_curve(&chain, SR, 200) {
            assert!(
                point.db.abs() < 1e-3,
                "{:.1} Hz evaluated to {} dB",
                point.frequency,
                point.db
            );
        }
    }

    #[test]
    fn six_db_peak_hits_centre_and_fades_out() {
        let chain = single_peak(6.0);
        let centre = evaluate_response_db(&chain, 1000.0, SR);
        assert!((centre - 6.0).abs() < 0.1, "centre {centre} dB");

        let near = evaluate_response_db(&chain, 2000.0, SR);
        let far = evaluate_response_db(&chain, 20.0, SR);
        assert!(near < centre && near > 0.0);
        assert!(far.abs() < 0.1, "20 Hz at {far} dB");
    }

    #[test]
    fn deep_stop_band_is_floored() {
        let mut settings = ChainSettings::default();
        settings.bands[0] = BandSettings::new(1000.0, 0.0, Slope::Slope48, BandType::LowPass);
        let chain = ChannelFilterChain::from_settings(&settings, SR);

        assert_eq!(evaluate_response_db(&chain, 20000.0, SR), RESPONSE_FLOOR_DB);
        let cutoff = evaluate_response_db(&chain, 1000.0, SR);
        assert!((cutoff + 3.01).abs() < 0.1, "cutoff at {cutoff} dB");
    }

    #[test]
    fn nan_response_is_dropped_not_floored() {
        let poison = FilterCoefficients {
            b0: f32::NAN,
            b1: f32::NAN,
            b2: f32::NAN,
            a1: f32::NAN,
            a2: f32::NAN,
        };
        let mut chain = single_peak(0.0);
        chain.apply_design(1, &BandDesign::Peak(poison));

        assert!(evaluate_response_db(&chain, 1000.0, SR).is_nan());
        assert!(response_curve(&chain, SR, 64).is_empty());
    }

    #[test]
    fn curve_spans_the_log_axis() {
        let chain = single_peak(3.0);
        let curve = response_curve(&chain, SR, 64);
        assert_eq!(curve.len(), 64);
        assert!((curve[0].frequency - 20.0).abs() < 1e-3);
        assert!((curve[63].frequency - 20000.0).abs() < 1.0);
        assert!(curve.windows(2).all(|w| w[0].frequency < w[1].frequency));
    }
}
