//! Second-order low-pass filter

use core::f32::consts::PI;

use crate::node::{Module, ParamId, ProcessContext};

/// Normalized biquad coefficients (`a0 == 1`)
#[derive(Clone, Copy, Debug, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    const IDENTITY: Self = Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 };

    /// Bilinear-transform low-pass (RBJ cookbook).
    ///
    /// Falls back to identity when `cutoff` is not inside `(0, sample_rate / 2)`
    /// or either setting is not a finite positive number.
    fn low_pass(cutoff: f32, q: f32, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f32 * 0.5;
        let usable = cutoff.is_finite() && q.is_finite() && q > 0.0;
        if !usable || sample_rate == 0 || cutoff <= 0.0 || cutoff >= nyquist {
            return Self::IDENTITY;
        }

        let omega = 2.0 * PI * cutoff / sample_rate as f32;
        let (sn, cs) = omega.sin_cos();
        let alpha = sn / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b0 = (1.0 - cs) * 0.5;
        Self {
            b0: b0 / a0,
            b1: (1.0 - cs) / a0,
            b2: b0 / a0,
            a1: -2.0 * cs / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// A resonant low-pass biquad (1 in / 1 out)
///
/// Keeps two samples of input and two of output history.
pub struct LowPass {
    cutoff: f32,
    q: f32,
    sample_rate: u32,
    coeffs: Coefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl LowPass {
    /// Cutoff frequency in Hz, clamped to `[20, 20000]`. Non-finite values are ignored.
    pub const CUTOFF: ParamId = ParamId(0);
    /// Resonance, clamped to `[0.1, 10]`. Non-finite values are ignored.
    pub const Q: ParamId = ParamId(1);

    /// A non-finite `cutoff` falls back to 1 kHz.
    pub fn new(cutoff: f32) -> Self {
        let cutoff = if cutoff.is_finite() { cutoff } else { 1000.0 };
        Self {
            cutoff: cutoff.clamp(20.0, 20000.0),
            q: core::f32::consts::FRAC_1_SQRT_2,
            sample_rate: 0,
            coeffs: Coefficients::IDENTITY,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn with_q(mut self, q: f32) -> Self {
        self.set_parameter(Self::Q, q);
        self
    }

    #[inline]
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    #[inline]
    pub fn q(&self) -> f32 {
        self.q
    }

    /// Whether the current settings reduce the filter to a pass-through.
    pub fn is_bypassed(&self) -> bool {
        self.coeffs == Coefficients::IDENTITY
    }

    fn update(&mut self) {
        self.coeffs = Coefficients::low_pass(self.cutoff, self.q, self.sample_rate);
    }
}

impl Default for LowPass {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

impl Module for LowPass {
    fn name(&self) -> &'static str {
        "low-pass"
    }

    fn init(&mut self, ctx: &ProcessContext) {
        self.sample_rate = ctx.sample_rate;
        self.update();
    }

    fn process(&mut self, _ctx: &ProcessContext, input: &[f32], output: &mut [f32]) {
        let Coefficients { b0, b1, b2, a1, a2 } = self.coeffs;
        let (mut x1, mut x2, mut y1, mut y2) = (self.x1, self.x2, self.y1, self.y2);

        for (out, &x) in output.iter_mut().zip(input) {
            let y = b0 * x + b1 * x1 + b2 * x2 - a1 * y1 - a2 * y2;
            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
            *out = y;
        }

        self.x1 = x1;
        self.x2 = x2;
        self.y1 = y1;
        self.y2 = y2;
    }

    fn set_parameter(&mut self, id: ParamId, value: f32) {
        if !value.is_finite() {
            return;
        }
        match id {
            Self::CUTOFF => self.cutoff = value.clamp(20.0, 20000.0),
            Self::Q => self.q = value.clamp(0.1, 10.0),
            _ => return,
        }
        self.update();
    }

    fn get_parameter(&self, id: ParamId) -> Option<f32> {
        match id {
            Self::CUTOFF => Some(self.cutoff),
            Self::Q => Some(self.q),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
