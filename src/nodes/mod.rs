//! Built-in audio nodes.
//!
//! Nodes are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! Generate audio and ignore their input:
//! - [`Oscillator`] - Sine wave oscillator with frequency/gain parameters
//!
//! ## Effects ([`effect`])
//!
//! Transform their summed input:
//! - [`LowPass`] - Second-order low-pass filter with cutoff/Q parameters
//! - [`Gain`] - Linear gain, also usable as a mixing bus
//!
//! ## Sinks ([`sink`])
//!
//! Expose audio to the outside of the graph:
//! - [`Output`] - Copies its input to one or more channel buffers
//!
//! # Parameters
//!
//! Each node kind defines its parameter ids as associated constants, e.g.
//! [`Oscillator::FREQUENCY`] or [`LowPass::CUTOFF`]. Use them with
//! [`AudioGraph::set_parameter`](crate::AudioGraph::set_parameter) before
//! the graph runs, or with a [`Controller`](crate::Controller) while it does.

pub mod source;
pub mod effect;
pub mod sink;

// Re-export common types at the top level for convenience
pub use source::Oscillator;
pub use effect::{Gain, LowPass};
pub use sink::Output;
