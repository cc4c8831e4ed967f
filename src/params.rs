use crate::audio::constants::{
    DEFAULT_FREQUENCIES, GAIN_MAX_DB, GAIN_MIN_DB, MAX_FREQUENCY, MIN_FREQUENCY, NUM_BANDS,
};
use crate::audio::settings::{BandSettings, BandType, ChainSettings, SettingsSource, Slope};
use nih_plug::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Dirty flag shared by every parameter callback and the display context
#[derive(Debug, Clone, Default)]
pub struct ChangeFlag(Arc<AtomicBool>);

impl ChangeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag if it is set. Returns whether it was set.
    ///
    /// A `mark` racing with this call is either consumed here or left for the
    /// next call, never lost.
    pub fn take(&self) -> bool {
        self.0
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_marked(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Params)]
pub struct EqParams {
    /// Exposed to the host as `freq_N`, `gain_N`, `type_N` and `slope_N`
    #[nested(array, group = "Band")]
    pub bands: [BandParams; NUM_BANDS],

    changed: ChangeFlag,
}

#[derive(Params)]
pub struct BandParams {
    #[id = "freq"]
    pub frequency: FloatParam,

    #[id = "gain"]
    pub gain: FloatParam,

    #[id = "type"]
    pub band_type: EnumParam<BandType>,

    #[id = "slope"]
    pub slope: EnumParam<Slope>,
}

impl BandParams {
    fn new(default_frequency: f32, changed: &ChangeFlag) -> Self {
        let on_change = {
            let changed = changed.clone();
            move || changed.mark()
        };
        let float_callback: Arc<dyn Fn(f32) + Send + Sync> = {
            let on_change = on_change.clone();
            Arc::new(move |_| on_change())
        };
        let type_callback: Arc<dyn Fn(BandType) + Send + Sync> = {
            let on_change = on_change.clone();
            Arc::new(move |_| on_change())
        };
        let slope_callback: Arc<dyn Fn(Slope) + Send + Sync> = Arc::new(move |_| on_change());

        Self {
            frequency: FloatParam::new(
                "Frequency",
                default_frequency,
                FloatRange::Skewed {
                    min: MIN_FREQUENCY,
                    max: MAX_FREQUENCY,
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_step_size(1.0)
            .with_value_to_string(formatters::v2s_f32_hz_then_khz(2))
            .with_string_to_value(formatters::s2v_f32_hz_then_khz())
            .with_callback(float_callback.clone()),

            gain: FloatParam::new(
                "Gain",
                0.0,
                FloatRange::Linear {
                    min: GAIN_MIN_DB,
                    max: GAIN_MAX_DB,
                },
            )
            .with_step_size(0.5)
            .with_unit(" dB")
            .with_value_to_string(formatters::v2s_f32_rounded(1))
            .with_callback(float_callback),

            band_type: EnumParam::new("Type", BandType::default()).with_callback(type_callback),

            slope: EnumParam::new("Slope", Slope::default()).with_callback(slope_callback),
        }
    }

    pub fn settings(&self) -> BandSettings {
        BandSettings::new(
            self.frequency.value(),
            self.gain.value(),
            self.slope.value(),
            self.band_type.value(),
        )
    }
}

impl Default for EqParams {
    fn default() -> Self {
        Self::new(ChangeFlag::new())
    }
}

impl EqParams {
    /// Parameters whose callbacks all mark `changed`
    pub fn new(changed: ChangeFlag) -> Self {
        Self {
            bands: DEFAULT_FREQUENCIES.map(|frequency| BandParams::new(frequency, &changed)),
            changed,
        }
    }

    pub fn change_flag(&self) -> &ChangeFlag {
        &self.changed
    }

    /// Plain copy of all twelve values. Atomic loads only, safe on the audio thread.
    pub fn snapshot(&self) -> ChainSettings {
        ChainSettings {
            bands: std::array::from_fn(|i| self.bands[i].settings()),
        }
    }
}

impl SettingsSource for EqParams {
    fn snapshot(&self) -> ChainSettings {
        EqParams::snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_twelve_parameters_with_band_suffixes() {
        let params = EqParams::default();
        let ids: Vec<String> = params
            .param_map()
            .into_iter()
            .map(|(id, _, _)| id)
            .collect();

        assert_eq!(ids.len(), 12);
        for band in 1..=NUM_BANDS {
            for name in ["freq", "gain", "type", "slope"] {
                let id = format!("{name}_{band}");
                assert!(ids.contains(&id), "missing {id} in {ids:?}");
            }
        }
    }

    #[test]
    fn default_snapshot_matches_default_chain() {
        let params = EqParams::default();
        assert_eq!(params.snapshot(), ChainSettings::default());
        assert_eq!(SettingsSource::snapshot(&params), ChainSettings::default());
    }

    #[test]
    fn take_clears_flag_once() {
        let flag = ChangeFlag::new();
        assert!(!flag.take());

        flag.mark();
        flag.mark();
        assert!(flag.is_marked());
        assert!(flag.take());
        assert!(!flag.take());
        assert!(!flag.is_marked());
    }

    #[test]
    fn params_share_the_given_flag() {
        let flag = ChangeFlag::new();
        let params = EqParams::new(flag.clone());
        params.change_flag().mark();
        assert!(flag.take());
    }
}
