use crate::audio::constants::{
    DEFAULT_FREQUENCIES, MAX_CUTOFF_RATIO, MAX_FREQUENCY, MAX_STAGES, MIN_FREQUENCY, NUM_BANDS,
};
use nih_plug::prelude::Enum;
use serde::{Deserialize, Serialize};

/// Filter shape of a single band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Enum, Serialize, Deserialize)]
pub enum BandType {
    #[name = "Low Pass"]
    LowPass,
    #[default]
    #[name = "Peak"]
    Peak,
    #[name = "High Pass"]
    HighPass,
}

/// Roll-off of a low/high pass band. Each 12 dB/oct adds one second-order section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Enum, Serialize, Deserialize)]
pub enum Slope {
    #[default]
    #[name = "12 dB/oct"]
    Slope12,
    #[name = "24 dB/oct"]
    Slope24,
    #[name = "36 dB/oct"]
    Slope36,
    #[name = "48 dB/oct"]
    Slope48,
}

impl Slope {
    pub const ALL: [Slope; MAX_STAGES] = [Self::Slope12, Self::Slope24, Self::Slope36, Self::Slope48];

    /// Number of cascaded second-order sections (1..=4)
    pub fn stages(self) -> usize {
        match self {
            Self::Slope12 => 1,
            Self::Slope24 => 2,
            Self::Slope36 => 3,
            Self::Slope48 => 4,
        }
    }

    /// Butterworth filter order
    pub fn order(self) -> usize {
        2 * self.stages()
    }

    pub fn db_per_octave(self) -> u32 {
        12 * self.stages() as u32
    }
}

/// Plain-data view of one band, copied out of the parameter store once per processing unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSettings {
    pub frequency: f32,
    pub gain: f32,
    pub slope: Slope,
    pub band_type: BandType,
}

impl BandSettings {
    pub fn new(frequency: f32, gain: f32, slope: Slope, band_type: BandType) -> Self {
        Self {
            frequency,
            gain,
            slope,
            band_type,
        }
    }

    /// Frequency clamped into the parameter range and strictly below Nyquist
    pub fn frequency_for(&self, sample_rate: f32) -> f32 {
        self.frequency
            .clamp(MIN_FREQUENCY, MAX_FREQUENCY)
            .min(sample_rate * MAX_CUTOFF_RATIO)
    }
}

/// The three bands in processing order. Band index is fixed and never reordered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub bands: [BandSettings; NUM_BANDS],
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            bands: DEFAULT_FREQUENCIES
                .map(|frequency| BandSettings::new(frequency, 0.0, Slope::Slope12, BandType::Peak)),
        }
    }
}

/// Anything that can hand out a consistent [`ChainSettings`] snapshot
pub trait SettingsSource: Send + Sync {
    fn snapshot(&self) -> ChainSettings;
}

impl SettingsSource for std::sync::RwLock<ChainSettings> {
    fn snapshot(&self) -> ChainSettings {
        match self.read() {
            Ok(settings) => *settings,
            // A poisoned lock still holds a complete Copy value
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
