use crate::audio::coefficients::FilterCoefficients;

/// One biquad slot of a band cascade.
///
/// Runs in transposed direct form II. A bypassed stage is skipped entirely by
/// the caller, its coefficients and state are never read.
#[derive(Debug, Clone, Copy)]
pub struct FilterStage {
    coefficients: FilterCoefficients,
    bypassed: bool,
    z1: f32,
    z2: f32,
}

impl Default for FilterStage {
    fn default() -> Self {
        Self {
            coefficients: FilterCoefficients::IDENTITY,
            bypassed: true,
            z1: 0.0,
            z2: 0.0,
        }
    }
}

impl FilterStage {
    /// Replace the coefficient set as a whole. Delay state is kept so that
    /// parameter moves do not click.
    pub fn install(&mut self, coefficients: FilterCoefficients) {
        self.coefficients = coefficients;
    }

    pub fn coefficients(&self) -> &FilterCoefficients {
        &self.coefficients
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let c = &self.coefficients;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
