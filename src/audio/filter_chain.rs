use crate::audio::coefficients::{BandDesign, FilterCoefficients};
use crate::audio::constants::{MAX_STAGES, NUM_BANDS};
use crate::audio::filter_stage::FilterStage;
use crate::audio::settings::ChainSettings;

/// Four biquad slots for one band. Only the leading stages implied by the
/// band's type and slope are active.
#[derive(Debug, Clone, Default)]
pub struct BandFilterCascade {
    stages: [FilterStage; MAX_STAGES],
}

impl BandFilterCascade {
    /// Install a band design and update the bypass flags to match it.
    ///
    /// Pass designs bypass every stage first, then fill and enable stages from
    /// the highest needed index down to 0. Whatever a bypassed stage still
    /// holds from an earlier design is never read.
    pub fn install(&mut self, design: &BandDesign) {
        match design {
            BandDesign::Peak(coefficients) => {
                for stage in &mut self.stages[1..] {
                    stage.set_bypassed(true);
                }
                self.stages[0].install(*coefficients);
                self.stages[0].set_bypassed(false);
            }
            BandDesign::Pass(cascade) => {
                for stage in &mut self.stages {
                    stage.set_bypassed(true);
                }

                for (stage, &section) in self.stages.iter_mut().zip(cascade.as_slice()).rev() {
                    stage.install(section);
                    stage.set_bypassed(false);
                }
            }
        }
    }

    pub fn active_stages(&self) -> usize {
        self.stages.iter().filter(|s| !s.is_bypassed()).count()
    }

    /// Coefficients of the active stages in signal order
    pub fn active_coefficients(&self) -> impl Iterator<Item = &FilterCoefficients> + '_ {
        self.stages
            .iter()
            .filter(|s| !s.is_bypassed())
            .map(FilterStage::coefficients)
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        self.stages
            .iter_mut()
            .filter(|s| !s.is_bypassed())
            .fold(input, |x, stage| stage.process_sample(x))
    }

    /// Linear magnitude at `frequency`. Bypassed stages contribute 1.0.
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.active_coefficients()
            .map(|c| c.magnitude_at(frequency, sample_rate))
            .product()
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

/// The three band cascades of one channel, applied in band order
#[derive(Debug, Clone, Default)]
pub struct ChannelFilterChain {
    bands: [BandFilterCascade; NUM_BANDS],
}

impl ChannelFilterChain {
    /// A chain with every band designed from `settings`
    pub fn from_settings(settings: &ChainSettings, sample_rate: f32) -> Self {
        let mut chain = Self::default();
        chain.update(settings, sample_rate);
        chain
    }

    pub fn apply_design(&mut self, band: usize, design: &BandDesign) {
        self.bands[band].install(design);
    }

    /// Redesign and install all bands
    pub fn update(&mut self, settings: &ChainSettings, sample_rate: f32) {
        for (cascade, band) in self.bands.iter_mut().zip(settings.bands.iter()) {
            cascade.install(&BandDesign::for_band(band, sample_rate));
        }
    }

    pub fn band(&self, index: usize) -> &BandFilterCascade {
        &self.bands[index]
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        self.bands
            .iter_mut()
            .fold(input, |x, cascade| cascade.process_sample(x))
    }

    pub fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Product of every active stage's magnitude across all bands
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.bands
            .iter()
            .map(|cascade| cascade.magnitude_at(frequency, sample_rate))
            .product()
    }

    pub fn reset(&mut self) {
        for cascade in &mut self.bands {
            cascade.reset();
        }
    }
}
