//! Sine wave oscillator

use core::f32::consts::TAU;

use crate::node::{Module, ParamId, ProcessContext};

/// A sine wave oscillator (mono source)
///
/// Ignores its input. Phase is kept in radians in `[0, 2π)`.
pub struct Oscillator {
    frequency: f32,
    gain: f32,
    phase: f32,
    phase_inc: f32,
    sample_rate: u32,
}

impl Oscillator {
    /// Frequency in Hz, clamped to `>= 0`. Non-finite values are ignored.
    pub const FREQUENCY: ParamId = ParamId(0);
    /// Linear output gain, clamped to `[0, 1]`. Non-finite values are ignored.
    pub const GAIN: ParamId = ParamId(1);

    /// A non-finite `frequency` falls back to 440 Hz.
    pub fn new(frequency: f32) -> Self {
        let frequency = if frequency.is_finite() { frequency } else { 440.0 };
        Self {
            frequency: frequency.max(0.0),
            gain: 0.2,
            phase: 0.0,
            phase_inc: 0.0,
            sample_rate: 0,
        }
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.set_parameter(Self::GAIN, gain);
        self
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    fn update_increment(&mut self) {
        self.phase_inc = if self.sample_rate == 0 {
            0.0
        } else {
            TAU * (self.frequency / self.sample_rate as f32)
        };
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(440.0)
    }
}

impl Module for Oscillator {
    fn name(&self) -> &'static str {
        "oscillator"
    }

    fn init(&mut self, ctx: &ProcessContext) {
        self.sample_rate = ctx.sample_rate;
        self.update_increment();
    }

    fn process(&mut self, _ctx: &ProcessContext, _input: &[f32], output: &mut [f32]) {
        let gain = self.gain;
        let inc = self.phase_inc;

        for sample in output.iter_mut() {
            *sample = gain * self.phase.sin();

            self.phase += inc;
            if self.phase >= TAU {
                // frequencies above the sample rate step more than one period
                self.phase %= TAU;
            }
        }
    }

    fn set_parameter(&mut self, id: ParamId, value: f32) {
        if !value.is_finite() {
            return;
        }
        match id {
            Self::FREQUENCY => {
                self.frequency = value.max(0.0);
                self.update_increment();
            }
            Self::GAIN => self.gain = value.clamp(0.0, 1.0),
            _ => {}
        }
    }

    fn get_parameter(&self, id: ParamId) -> Option<f32> {
        match id {
            Self::FREQUENCY => Some(self.frequency),
            Self::GAIN => Some(self.gain),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: ProcessContext = ProcessContext { sample_rate: 44100, block_length: 128 };

    #[test]
    fn starts_at_zero_and_follows_sine() {
        let mut osc = Oscillator::new(440.0).with_gain(0.2);
        osc.init(&CTX);
        let mut out = [1.0; 128];
        osc.process(&CTX, &[0.0; 128], &mut out);

        assert_eq!(out[0], 0.0);
        for (n, sample) in out.iter().enumerate() {
            let expected = 0.2 * (TAU * 440.0 * n as f32 / 44100.0).sin();
            assert!((sample - expected).abs() < 1e-4, "sample {n}: {sample} vs {expected}");
        }
    }

    #[test]
    fn phase_stays_wrapped() {
        let mut osc = Oscillator::new(30000.0);
        osc.init(&CTX);
        let mut out = [0.0; 128];
        for _ in 0..16 {
            osc.process(&CTX, &[], &mut out);
            assert!((0.0..TAU).contains(&osc.phase()));
        }
    }

    #[test]
    fn parameters_clamp_and_reset_keeps_them() {
        let mut osc = Oscillator::default();
        osc.init(&CTX);
        osc.set_parameter(Oscillator::GAIN, 3.0);
        osc.set_parameter(Oscillator::FREQUENCY, -5.0);
        osc.set_parameter(ParamId(42), 1.0);

        assert_eq!(osc.get_parameter(Oscillator::GAIN), Some(1.0));
        assert_eq!(osc.get_parameter(Oscillator::FREQUENCY), Some(0.0));
        assert_eq!(osc.get_parameter(ParamId(42)), None);

        osc.set_parameter(Oscillator::FREQUENCY, 1000.0);
        let mut out = [0.0; 16];
        osc.process(&CTX, &[], &mut out);
        assert!(osc.phase() > 0.0);

        osc.reset();
        assert_eq!(osc.phase(), 0.0);
        assert_eq!(osc.frequency(), 1000.0);
    }

    #[test]
    fn non_finite_parameters_are_ignored() {
        let mut osc = Oscillator::new(440.0).with_gain(f32::NAN);
        osc.init(&CTX);
        osc.set_parameter(Oscillator::FREQUENCY, f32::INFINITY);
        osc.set_parameter(Oscillator::GAIN, f32::NAN);
        assert_eq!(osc.frequency(), 440.0);
        assert_eq!(osc.gain(), 0.2);

        let mut out = [0.0; 128];
        osc.process(&CTX, &[], &mut out);
        assert!((0.0..TAU).contains(&osc.phase()));
        assert!(out.iter().all(|s| s.is_finite()));

        // the largest finite frequency still keeps the phase wrapped
        osc.set_parameter(Oscillator::FREQUENCY, f32::MAX);
        osc.process(&CTX, &[], &mut out);
        assert!((0.0..TAU).contains(&osc.phase()));
        assert!(out.iter().all(|s| s.is_finite()));
        assert_eq!(Oscillator::new(f32::NAN).frequency(), 440.0);
    }
}
