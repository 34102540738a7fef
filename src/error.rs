//! Error types for graph construction, the ring buffer and the engine.

use alloc::vec::Vec;

use thiserror::Error;

use crate::node::NodeId;

/// Errors reported while building or initializing an [`AudioGraph`](crate::AudioGraph).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The id does not name a node of this graph.
    #[error("node {0} does not belong to this graph")]
    UnknownNode(NodeId),

    /// A node cannot feed its own input.
    #[error("cannot connect node {0} to itself")]
    SelfConnection(NodeId),

    /// The same source/destination pair was connected twice.
    #[error("node {from} is already connected to node {to}")]
    DuplicateConnection { from: NodeId, to: NodeId },

    /// The connections do not form a DAG. `nodes` lists the nodes that sit on a cycle.
    #[error("graph contains a cycle through nodes {nodes:?}")]
    Cycle { nodes: Vec<NodeId> },

    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("block length must be non-zero")]
    ZeroBlockLength,

    /// Buffer memory for a node could not be reserved.
    #[error("failed to allocate {samples} samples for node {node}")]
    Allocation { node: NodeId, samples: usize },

    /// The control queue producer for this node was already handed out.
    #[error("controller for node {0} was already taken")]
    ControllerTaken(NodeId),
}

/// Errors and backpressure signals from the sample ring buffer.
///
/// `Full` and `Empty` are not failures of the buffer: they tell the caller that
/// nothing was transferred and that it should retry or substitute a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    #[error("ring buffer capacity must be non-zero")]
    ZeroCapacity,

    #[error("ring buffer full: {requested} samples requested, {available} slots free")]
    Full { requested: usize, available: usize },

    #[error("ring buffer empty: {requested} samples requested, {available} available")]
    Empty { requested: usize, available: usize },
}

/// Invalid [`EngineConfig`](crate::EngineConfig) values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("block length must be non-zero")]
    ZeroBlockLength,

    #[error("channel count must be at least 1")]
    ZeroChannels,

    #[error("ring buffer must hold at least {minimum} blocks, got {blocks}")]
    RingTooSmall { blocks: usize, minimum: usize },
}

/// Errors from starting, running or stopping the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Ring(#[from] RingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn transport thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("transport thread panicked")]
    TransportPanicked,

    #[cfg(feature = "cpal_sink")]
    #[error("unsupported device sample format: {0}")]
    UnsupportedFormat(String),

    #[cfg(feature = "cpal_sink")]
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal_sink")]
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}
