pub mod audio_engine;
pub mod coefficients;
pub mod constants;
pub mod fft_engine;
pub mod filter_chain;
pub mod filter_stage;
pub mod response;
pub mod ring_buffer;
pub mod sample_buffer_engine;
pub mod settings;
pub mod spectrum;
pub mod spectrum_engine;

pub use audio_engine::AudioEngine;
pub use coefficients::{BandDesign, CascadeCoefficients, FilterCoefficients};
pub use filter_chain::{BandFilterCascade, ChannelFilterChain};
pub use response::{evaluate_response_db, response_curve, CurvePoint};
pub use ring_buffer::LockFreeRingBuffer;
pub use settings::{BandSettings, BandType, ChainSettings, SettingsSource, Slope};
pub use spectrum::{AnalysisFrame, AnalyzerState, SpectrumAnalyzer};
