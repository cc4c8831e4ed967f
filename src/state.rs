//! Opaque state blob for a full [`ChainSettings`].
//!
//! The blob is a versioned JSON tree:
//!
//! ```json
//! { "version": 1,
//!   "bands": { "band1": { "frequency": 20.0, "gain": 0.0, "type": "Peak", "slope": "Slope12" },
//!              "band2": { ... }, "band3": { ... } } }
//! ```
//!
//! Loading is all or nothing. Missing or unknown fields, another version, or a
//! value outside the parameter ranges rejects the whole blob.
//!
//! Host sessions store the twelve parameters through `nih_plug` instead. That
//! map goes through [`decode_params`] before any value is applied, with the
//! same range checks as the blob.

use crate::audio::constants::{GAIN_MAX_DB, GAIN_MIN_DB, MAX_FREQUENCY, MIN_FREQUENCY};
use crate::audio::settings::{BandSettings, BandType, ChainSettings, Slope};
use nih_plug::prelude::Enum;
use nih_plug::wrapper::state::ParamValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("malformed state blob: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported state version {0}, expected {}", STATE_VERSION)]
    UnsupportedVersion(u32),

    #[error("band {band} {field} = {value} is outside {min}..={max}")]
    OutOfRange {
        band: usize,
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("host state has no value for {0}")]
    MissingParameter(String),

    #[error("host state holds an unusable value for {0}")]
    InvalidParameter(String),
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateTree {
    version: u32,
    bands: BandsTree,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BandsTree {
    band1: BandTree,
    band2: BandTree,
    band3: BandTree,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BandTree {
    frequency: f32,
    gain: f32,
    #[serde(rename = "type")]
    band_type: BandType,
    slope: Slope,
}

impl From<&BandSettings> for BandTree {
    fn from(band: &BandSettings) -> Self {
        Self {
            frequency: band.frequency,
            gain: band.gain,
            band_type: band.band_type,
            slope: band.slope,
        }
    }
}

impl From<&BandTree> for BandSettings {
    fn from(tree: &BandTree) -> Self {
        BandSettings::new(tree.frequency, tree.gain, tree.slope, tree.band_type)
    }
}

fn validate(settings: &ChainSettings) -> Result<(), StateError> {
    for (index, band) in settings.bands.iter().enumerate() {
        let checks = [
            ("frequency", band.frequency, MIN_FREQUENCY, MAX_FREQUENCY),
            ("gain", band.gain, GAIN_MIN_DB, GAIN_MAX_DB),
        ];
        for (field, value, min, max) in checks {
            // NaN fails the range check too
            if !(min..=max).contains(&value) {
                return Err(StateError::OutOfRange {
                    band: index + 1,
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
    }
    Ok(())
}

/// Serialize `settings`. Refuses values that [`decode`] would reject.
pub fn encode(settings: &ChainSettings) -> Result<Vec<u8>, StateError> {
    validate(settings)?;

    let [band1, band2, band3] = &settings.bands;
    let tree = StateTree {
        version: STATE_VERSION,
        bands: BandsTree {
            band1: band1.into(),
            band2: band2.into(),
            band3: band3.into(),
        },
    };
    Ok(serde_json::to_vec(&tree)?)
}

pub fn decode(bytes: &[u8]) -> Result<ChainSettings, StateError> {
    let header: VersionHeader = serde_json::from_slice(bytes)?;
    if header.version != STATE_VERSION {
        return Err(StateError::UnsupportedVersion(header.version));
    }

    let tree: StateTree = serde_json::from_slice(bytes)?;
    let settings = ChainSettings {
        bands: [
            (&tree.bands.band1).into(),
            (&tree.bands.band2).into(),
            (&tree.bands.band3).into(),
        ],
    };
    validate(&settings)?;
    Ok(settings)
}

/// Rebuild all bands from a host parameter map, keyed by `freq_N`, `gain_N`,
/// `type_N` and `slope_N`. Fails unless every one of the twelve ids is
/// present, of the right kind and in range. Unknown ids are ignored.
pub fn decode_params(params: &BTreeMap<String, ParamValue>) -> Result<ChainSettings, StateError> {
    let mut settings = ChainSettings::default();
    for (index, band) in settings.bands.iter_mut().enumerate() {
        let n = index + 1;
        *band = BandSettings::new(
            float_param(params, &format!("freq_{n}"))?,
            float_param(params, &format!("gain_{n}"))?,
            enum_param(params, &format!("slope_{n}"))?,
            enum_param(params, &format!("type_{n}"))?,
        );
    }
    validate(&settings)?;
    Ok(settings)
}

fn param<'a>(
    params: &'a BTreeMap<String, ParamValue>,
    id: &str,
) -> Result<&'a ParamValue, StateError> {
    params
        .get(id)
        .ok_or_else(|| StateError::MissingParameter(id.to_owned()))
}

fn float_param(params: &BTreeMap<String, ParamValue>, id: &str) -> Result<f32, StateError> {
    match param(params, id)? {
        ParamValue::F32(value) => Ok(*value),
        _ => Err(StateError::InvalidParameter(id.to_owned())),
    }
}

/// Enum params are stored as a variant index, or as a stable id for enums that have them
fn enum_param<T: Enum>(params: &BTreeMap<String, ParamValue>, id: &str) -> Result<T, StateError> {
    let index = match param(params, id)? {
        ParamValue::I32(index) => usize::try_from(*index).ok(),
        ParamValue::String(name) => T::ids()
            .and_then(|ids| ids.iter().position(|candidate| *candidate == name.as_str())),
        _ => None,
    };

    index
        .filter(|&index| index < T::variants().len())
        .map(T::from_index)
        .ok_or_else(|| StateError::InvalidParameter(id.to_owned()))
}

impl ChainSettings {
    /// Replace every band from a state blob. On error `self` is left as it was.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        match decode(bytes) {
            Ok(settings) => {
                *self = settings;
                Ok(())
            }
            Err(err) => {
                nih_plug::nih_warn!("Rejected state blob: {err}");
                Err(err)
            }
        }
    }
}
