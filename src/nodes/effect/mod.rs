mod gain;
mod lowpass;

pub use gain::*;
pub use lowpass::*;
