//! High-level engine API
//!
//! Builds the graph, the ring buffer and the transport thread from one
//! [`EngineConfig`].

use tracing::info;

use crate::callback::BlockReader;
use crate::config::EngineConfig;
use crate::error::{EngineError, GraphError};
use crate::graph::{AudioGraph, Controller};
use crate::node::{Module, NodeId, ParamId};
use crate::nodes::Output;
use crate::ring::SampleRing;
use crate::transport::{Transport, TransportConfig, TransportStats};

#[cfg(feature = "cpal_sink")]
use crate::device::CpalDevice;

/// The main engine: an audio graph plus the configuration it will run with.
///
/// # Example
///
/// ```
/// use keiko::{Engine, EngineConfig};
/// use keiko::nodes::Oscillator;
///
/// let mut engine = Engine::new(EngineConfig::new(44100).with_channels(2));
/// let osc = engine.add(Oscillator::new(440.0).with_gain(0.2));
/// engine.output(osc).unwrap();
///
/// let (running, mut reader) = engine.start().unwrap();
/// let mut block = [0.0; 256];
/// while reader.fill(&mut block) != keiko::Delivery::Fresh {}
/// let (_engine, stats) = running.stop().unwrap();
/// assert!(stats.blocks > 0);
/// ```
pub struct Engine {
    graph: AudioGraph,
    config: EngineConfig,
    sink: NodeId,
}

impl Engine {
    /// Create an engine whose graph already contains an output sink with
    /// `config.channels` channels.
    pub fn new(config: EngineConfig) -> Self {
        let mut graph = AudioGraph::with_queue_size(config.control_queue_size);
        let sink = graph.add_node(Output::new(config.channels));
        Self { graph, config, sink }
    }

    /// Create an engine matching the sample rate and channel count of `device`
    #[cfg(feature = "cpal_sink")]
    pub fn for_device(device: &CpalDevice) -> Self {
        let config = EngineConfig::new(device.sample_rate())
            .with_channels(usize::from(device.channels()));
        Self::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The built-in output sink.
    pub fn sink(&self) -> NodeId {
        self.sink
    }

    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AudioGraph {
        &mut self.graph
    }

    /// Add a node to the graph
    pub fn add<M: Module>(&mut self, module: M) -> NodeId {
        self.graph.add_node(module)
    }

    /// Connect two nodes
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.graph.connect(from, to).map(|_| ())
    }

    /// Connect a node to the output sink
    pub fn output(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.connect(node, self.sink)
    }

    pub fn set_parameter(&mut self, node: NodeId, id: ParamId, value: f32) -> Result<(), GraphError> {
        self.graph.set_parameter(node, id, value)
    }

    pub fn get_parameter(&self, node: NodeId, id: ParamId) -> Result<Option<f32>, GraphError> {
        self.graph.get_parameter(node, id)
    }

    /// Take the control queue of a node, for parameter updates while running.
    pub fn controller(&mut self, node: NodeId) -> Result<Controller, GraphError> {
        self.graph.controller(node)
    }

    /// Validate the configuration and initialize the graph.
    ///
    /// On error the engine keeps its graph, nodes and parameters; only the
    /// previous initialization is discarded.
    pub fn prepare(&mut self) -> Result<(), EngineError> {
        self.config.validate()?;
        self.graph.set_output(self.sink)?;
        self.graph.init(self.config.sample_rate, self.config.block_length)?;
        Ok(())
    }

    /// Prepare the engine and start the transport thread.
    ///
    /// Returns the running engine and the reader to call from the device callback.
    /// Call [`prepare`](Self::prepare) first to keep the engine if preparation fails.
    pub fn start(mut self) -> Result<(RunningEngine, BlockReader), EngineError> {
        self.prepare()?;

        let (producer, consumer) = SampleRing::new(self.config.ring_capacity())?;
        let reader = BlockReader::new(consumer, self.config.ring_capacity());

        let transport_config = TransportConfig {
            block_length: self.config.block_length,
            channels: self.config.channels,
            backoff: self.config.backoff,
            underruns: Some(reader.underrun_counter()),
        };

        info!(
            sample_rate = self.config.sample_rate,
            ring_capacity = self.config.ring_capacity(),
            "starting engine"
        );
        let transport = Transport::spawn(self.graph, producer, transport_config)?;

        Ok((
            RunningEngine { transport, config: self.config, sink: self.sink },
            reader,
        ))
    }

    /// Start the engine and play it on `device`.
    #[cfg(feature = "cpal_sink")]
    pub fn play(self, device: &CpalDevice) -> Result<Playback, EngineError> {
        use cpal::traits::StreamTrait;

        let (engine, reader) = self.start()?;
        let stream = device.build_stream(reader)?;
        stream.play()?;
        Ok(Playback { stream, engine })
    }
}

/// An engine whose transport thread is running.
pub struct RunningEngine {
    transport: Transport,
    config: EngineConfig,
    sink: NodeId,
}

impl RunningEngine {
    pub fn is_running(&self) -> bool {
        self.transport.is_running()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop the transport and get the engine back, graph intact.
    pub fn stop(self) -> Result<(Engine, TransportStats), EngineError> {
        let (graph, stats) = self.transport.stop()?;
        Ok((Engine { graph, config: self.config, sink: self.sink }, stats))
    }
}

/// An engine playing on a device stream.
#[cfg(feature = "cpal_sink")]
pub struct Playback {
    stream: cpal::Stream,
    engine: RunningEngine,
}

#[cfg(feature = "cpal_sink")]
impl Playback {
    /// Stop the device stream, then the transport.
    pub fn stop(self) -> Result<(Engine, TransportStats), EngineError> {
        drop(self.stream);
        self.engine.stop()
    }
}
