use crate::audio::constants::{freq_to_log_position, MAX_FREQUENCY, MIN_FREQUENCY};
use crate::audio::response::CurvePoint;
use crate::audio::spectrum::AnalysisFrame;

/// Turns analysis frames into spectrum polylines for the renderer.
/// Runs on the display thread and keeps its point buffer between frames.
pub struct SpectrumEngine {
    points: Vec<CurvePoint>,
    skipped: usize,
}

impl Default for SpectrumEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumEngine {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            skipped: 0,
        }
    }

    /// Map every bin of `frame` inside 20 Hz..=20 kHz onto the log axis.
    ///
    /// The DC bin has no place on a log axis and is skipped, as are bins past
    /// the axis and bins holding a non-finite value.
    pub fn update(&mut self, frame: &AnalysisFrame, sample_rate: f32) -> &[CurvePoint] {
        self.points.clear();
        self.skipped = 0;

        for (index, &db) in frame.bins().iter().enumerate().skip(1) {
            let frequency = frame.bin_frequency(index, sample_rate);
            if frequency < MIN_FREQUENCY {
                continue;
            }
            if frequency > MAX_FREQUENCY {
                break;
            }

            let position = freq_to_log_position(frequency);
            if !db.is_finite() || !position.is_finite() {
                self.skipped += 1;
                continue;
            }

            self.points.push(CurvePoint {
                position,
                frequency,
                db,
            });
        }

        &self.points
    }

    /// Points produced by the last [`update`](Self::update)
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Non-finite bins dropped by the last update
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
