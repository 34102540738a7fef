//! Core module trait and context types.

use core::fmt;

/// Information available during audio processing.
///
/// Passed to [`Module::init`] and every [`Module::process`] call. Fixed for
/// the lifetime of one run of the graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of samples per block
    pub block_length: usize,
}

impl ProcessContext {
    /// Highest representable frequency at this sample rate.
    #[inline]
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 * 0.5
    }
}

/// Unique identifier for a node within a graph.
///
/// Ids are stable indices into the graph's node arena, assigned in insertion order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in insertion order.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a connection within a graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ConnectionId(pub(crate) usize);

impl ConnectionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A parameter identifier. Each module kind defines its own id space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ParamId(pub u32);

/// A parameter update queued for a node through a [`Controller`](crate::Controller).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ParamChange {
    pub id: ParamId,
    pub value: f32,
}

/// The capability contract every node kind implements.
///
/// A module is created by its own constructor and destroyed by `Drop`. The
/// graph calls [`init`](Module::init) once before the first
/// [`process`](Module::process), and again only while processing is paused.
///
/// `set_parameter`, `get_parameter` and `reset` are optional: the default
/// implementations do nothing and report no parameters.
///
/// ```
/// use keiko::{Module, ParamId, ProcessContext};
///
/// /// Outputs a constant level.
/// struct Dc {
///     level: f32,
/// }
///
/// impl Module for Dc {
///     fn name(&self) -> &'static str { "dc" }
///
///     fn process(&mut self, _ctx: &ProcessContext, _input: &[f32], output: &mut [f32]) {
///         output.fill(self.level);
///     }
///
///     fn set_parameter(&mut self, id: ParamId, value: f32) {
///         if id == ParamId(0) {
///             self.level = value.clamp(-1.0, 1.0);
///         }
///     }
///
///     fn get_parameter(&self, id: ParamId) -> Option<f32> {
///         (id == ParamId(0)).then_some(self.level)
///     }
/// }
/// ```
pub trait Module: Send + 'static {
    /// Short kind name, used in log output.
    fn name(&self) -> &'static str;

    /// Receive the fixed operating parameters for the run.
    ///
    /// Recompute anything that depends on the sample rate here. This is the
    /// only place besides the constructor where a module may allocate.
    fn init(&mut self, _ctx: &ProcessContext) {}

    /// Process one block.
    ///
    /// `input` holds the sum of every connected source (silence for nodes
    /// without connections) and `output` must be completely written. Must
    /// not allocate, block, or touch anything but `self` and the two slices.
    fn process(&mut self, ctx: &ProcessContext, input: &[f32], output: &mut [f32]);

    /// Update a parameter. Unknown ids are ignored.
    fn set_parameter(&mut self, _id: ParamId, _value: f32) {}

    /// Read a parameter. Unknown ids return `None`.
    fn get_parameter(&self, _id: ParamId) -> Option<f32> {
        None
    }

    /// Clear time-varying state (phase, filter history), keeping configuration.
    fn reset(&mut self) {}

    /// Externally visible channel buffers, filled by sinks during `process`.
    ///
    /// Empty for every node that is not a sink.
    fn output_channels(&self) -> &[Box<[f32]>] {
        &[]
    }
}
