//! Gain/volume stage

use crate::node::{Module, ParamId, ProcessContext};

/// Scales its (summed) input by a linear gain
///
/// With unity gain this doubles as a mixing bus, since the graph already sums
/// every connected source into the input.
pub struct Gain {
    gain: f32,
}

impl Gain {
    /// Linear gain, clamped to `[0, 4]`. Non-finite values are ignored.
    pub const GAIN: ParamId = ParamId(0);

    /// A non-finite `gain` falls back to unity.
    pub fn new(gain: f32) -> Self {
        let gain = if gain.is_finite() { gain } else { 1.0 };
        Self { gain: gain.clamp(0.0, 4.0) }
    }

    /// A unity-gain bus.
    pub fn unity() -> Self {
        Self::new(1.0)
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Module for Gain {
    fn name(&self) -> &'static str {
        "gain"
    }

    fn process(&mut self, _ctx: &ProcessContext, input: &[f32], output: &mut [f32]) {
        let gain = self.gain;
        for (out, &x) in output.iter_mut().zip(input) {
            *out = x * gain;
        }
    }

    fn set_parameter(&mut self, id: ParamId, value: f32) {
        if id == Self::GAIN && value.is_finite() {
            self.gain = value.clamp(0.0, 4.0);
        }
    }

    fn get_parameter(&self, id: ParamId) -> Option<f32> {
        (id == Self::GAIN).then_some(self.gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_and_clamps() {
        let ctx = ProcessContext { sample_rate: 48000, block_length: 4 };
        let mut gain = Gain::new(0.5);
        let mut out = [0.0; 4];
        gain.process(&ctx, &[1.0, -1.0, 0.5, 0.0], &mut out);
        assert_eq!(out, [0.5, -0.5, 0.25, 0.0]);

        gain.set_parameter(Gain::GAIN, 10.0);
        assert_eq!(gain.get_parameter(Gain::GAIN), Some(4.0));
        assert_eq!(gain.get_parameter(ParamId(7)), None);
    }

    #[test]
    fn non_finite_gain_is_ignored() {
        let mut gain = Gain::new(f32::NAN);
        assert_eq!(gain.gain(), 1.0);
        gain.set_parameter(Gain::GAIN, 2.0);
        gain.set_parameter(Gain::GAIN, f32::INFINITY);
        gain.set_parameter(Gain::GAIN, f32::NAN);
        assert_eq!(gain.get_parameter(Gain::GAIN), Some(2.0));
    }
}
