//! Audio graph - owns nodes, connections and the evaluation order

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use hashbrown::HashSet;
use itertools::Itertools;
use petgraph::graph::DiGraph;
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, info, warn};

use crate::error::GraphError;
use crate::node::{ConnectionId, Module, NodeId, ParamChange, ParamId, ProcessContext};

/// Default capacity of each node's control message queue.
pub const DEFAULT_CONTROL_QUEUE_SIZE: usize = 64;

/// Sends parameter updates to one node of a running graph.
///
/// Obtained once per node from [`AudioGraph::controller`]. Updates are applied
/// at the start of the node's next processing cycle.
pub struct Controller {
    node: NodeId,
    sender: Producer<ParamChange>,
}

impl Controller {
    /// Queue a parameter update.
    ///
    /// Returns `Err(change)` if the queue is full (the update is dropped).
    pub fn set(&mut self, id: ParamId, value: f32) -> Result<(), ParamChange> {
        self.sender
            .push(ParamChange { id, value })
            .map_err(|rtrb::PushError::Full(change)| change)
    }

    /// The node this controller addresses.
    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// A directed edge from a source node's output to a destination node's input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub source: NodeId,
    pub destination: NodeId,
}

struct Node {
    module: Box<dyn Module>,
    input: Vec<f32>,
    output: Vec<f32>,
    incoming: Vec<ConnectionId>,
    outgoing: Vec<ConnectionId>,
    receiver: Consumer<ParamChange>,
    sender: Option<Producer<ParamChange>>,
}

impl Node {
    fn apply_pending(&mut self) {
        while let Ok(change) = self.receiver.pop() {
            self.module.set_parameter(change.id, change.value);
        }
    }
}

/// Borrow the destination mutably and the source immutably out of one arena.
#[inline]
fn split_pair(nodes: &mut [Node], dst: usize, src: usize) -> (&mut Node, &Node) {
    if dst < src {
        let (head, tail) = nodes.split_at_mut(src);
        (&mut head[dst], &tail[0])
    } else {
        let (head, tail) = nodes.split_at_mut(dst);
        (&mut tail[0], &head[src])
    }
}

/// A directed acyclic graph of [`Module`]s processed block by block.
///
/// Build the graph with [`add_node`](Self::add_node) and
/// [`connect`](Self::connect), then call [`init`](Self::init) once with the
/// run's sample rate and block length. After that, every call to
/// [`process`](Self::process) runs one cycle in topological order.
///
/// ```
/// use keiko::AudioGraph;
/// use keiko::nodes::{Oscillator, Output};
///
/// let mut graph = AudioGraph::new();
/// let osc = graph.add_node(Oscillator::new(440.0));
/// let out = graph.add_node(Output::new(2));
/// graph.connect(osc, out).unwrap();
///
/// graph.init(44100, 128).unwrap();
/// graph.process(128);
/// assert_eq!(graph.output_of(out).unwrap()[0], 0.0);
/// ```
pub struct AudioGraph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    edges: HashSet<(NodeId, NodeId)>,

    /// Valid topological order, empty until `init` succeeds.
    order: Vec<NodeId>,
    ctx: Option<ProcessContext>,
    output: Option<NodeId>,
    queue_size: usize,
}

impl AudioGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::with_queue_size(DEFAULT_CONTROL_QUEUE_SIZE)
    }

    /// Create an empty graph whose nodes get control queues of `queue_size` messages
    pub fn with_queue_size(queue_size: usize) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            edges: HashSet::new(),
            order: Vec::new(),
            ctx: None,
            output: None,
            queue_size: queue_size.max(1),
        }
    }

    /// Add a node, returns its id
    ///
    /// Adding a node invalidates any previous [`init`](Self::init).
    pub fn add_node<M: Module>(&mut self, module: M) -> NodeId {
        self.add_boxed(Box::new(module))
    }

    /// Add an already boxed module
    pub fn add_boxed(&mut self, module: Box<dyn Module>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let (sender, receiver) = RingBuffer::new(self.queue_size);

        debug!(node = %id, kind = module.name(), "adding node");
        self.nodes.push(Node {
            module,
            input: Vec::new(),
            output: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            receiver,
            sender: Some(sender),
        });
        self.invalidate();
        id
    }

    /// Connect the output of `source` to the input of `destination`
    ///
    /// Connecting invalidates any previous [`init`](Self::init).
    pub fn connect(&mut self, source: NodeId, destination: NodeId) -> Result<ConnectionId, GraphError> {
        self.check(source)?;
        self.check(destination)?;
        if source == destination {
            return Err(GraphError::SelfConnection(source));
        }
        if !self.edges.insert((source, destination)) {
            return Err(GraphError::DuplicateConnection { from: source, to: destination });
        }

        let id = ConnectionId(self.connections.len());
        self.connections.push(Connection { source, destination });
        self.nodes[source.0].outgoing.push(id);
        self.nodes[destination.0].incoming.push(id);

        debug!(%source, %destination, "connected");
        self.invalidate();
        Ok(id)
    }

    /// Choose which node's output the transport forwards.
    ///
    /// Without an explicit choice the last node in evaluation order is used.
    pub fn set_output(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.check(node)?;
        self.output = Some(node);
        Ok(())
    }

    /// Take the control queue producer for `node`. Each node has exactly one.
    pub fn controller(&mut self, node: NodeId) -> Result<Controller, GraphError> {
        self.check(node)?;
        let sender = self.nodes[node.0]
            .sender
            .take()
            .ok_or(GraphError::ControllerTaken(node))?;
        Ok(Controller { node, sender })
    }

    /// Prepare the graph for processing.
    ///
    /// Computes the evaluation order, calls every module's
    /// [`init`](Module::init) and sizes each node's buffers to
    /// `block_length`. On error the graph is left un-initialized and
    /// [`process`](Self::process) does nothing.
    pub fn init(&mut self, sample_rate: u32, block_length: usize) -> Result<(), GraphError> {
        self.invalidate();
        if sample_rate == 0 {
            return Err(GraphError::ZeroSampleRate);
        }
        if block_length == 0 {
            return Err(GraphError::ZeroBlockLength);
        }

        let order = self.topological_order()?;

        // reserve everything up front so a failure leaves no half-sized node behind
        for (index, node) in self.nodes.iter_mut().enumerate() {
            for buffer in [&mut node.input, &mut node.output] {
                buffer.clear();
                buffer
                    .try_reserve_exact(block_length)
                    .map_err(|_| GraphError::Allocation { node: NodeId(index), samples: block_length })?;
            }
        }

        let ctx = ProcessContext { sample_rate, block_length };
        for node in self.nodes.iter_mut() {
            node.module.init(&ctx);
            node.input.resize(block_length, 0.0);
            node.output.resize(block_length, 0.0);
        }

        info!(
            sample_rate,
            block_length,
            nodes = self.nodes.len(),
            connections = self.connections.len(),
            "graph initialized"
        );
        debug!(
            "evaluation order: {}",
            order
                .iter()
                .map(|id| format!("{}:{}", id, self.nodes[id.0].module.name()))
                .join(" -> ")
        );

        self.order = order;
        self.ctx = Some(ctx);
        Ok(())
    }

    /// Run one cycle of `num_samples` samples through every node in evaluation order.
    ///
    /// `num_samples` is clamped to the block length. Does nothing before a
    /// successful [`init`](Self::init). Never allocates.
    pub fn process(&mut self, num_samples: usize) {
        let ctx = match self.ctx {
            Some(ctx) => ctx,
            None => return,
        };
        let n = num_samples.min(ctx.block_length);

        for k in 0..self.order.len() {
            let index = self.order[k].0;
            self.nodes[index].input[..n].fill(0.0);

            for c in 0..self.nodes[index].incoming.len() {
                let connection = self.nodes[index].incoming[c];
                let source = self.connections[connection.0].source.0;
                let (dst, src) = split_pair(&mut self.nodes, index, source);
                for (acc, sample) in dst.input[..n].iter_mut().zip(&src.output[..n]) {
                    *acc += *sample;
                }
            }

            let node = &mut self.nodes[index];
            node.apply_pending();
            node.module.process(&ctx, &node.input[..n], &mut node.output[..n]);
        }
    }

    /// Write the output node's last block into `out` as interleaved frames.
    ///
    /// Sinks provide one buffer per channel; any other output node has its
    /// mono output broadcast to every channel. When the node has fewer
    /// channels than requested the last one is repeated. Returns the number
    /// of frames written.
    pub fn render_interleaved(&self, out: &mut [f32], channels: usize) -> usize {
        let node = match self.output_node() {
            Some(id) if channels > 0 => &self.nodes[id.0],
            _ => return 0,
        };

        let sink_channels = node.module.output_channels();
        let frames = (out.len() / channels).min(node.output.len());

        for (i, frame) in out.chunks_exact_mut(channels).take(frames).enumerate() {
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = match sink_channels.len() {
                    0 => node.output[i],
                    len => sink_channels[ch.min(len - 1)].get(i).copied().unwrap_or(0.0),
                };
            }
        }
        frames
    }

    /// The node the transport forwards: the chosen output, or the last node in evaluation order.
    pub fn output_node(&self) -> Option<NodeId> {
        self.output.or_else(|| self.order.last().copied())
    }

    /// Kahn's algorithm over the connection arena, ties broken by insertion order.
    fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.incoming.len()).collect();
        let mut ready: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| index)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(index) = ready.pop_front() {
            order.push(NodeId(index));
            for connection in &self.nodes[index].outgoing {
                let next = self.connections[connection.0].destination.0;
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let nodes = self.cycle_members();
            warn!(?nodes, "graph contains a cycle");
            return Err(GraphError::Cycle { nodes });
        }
        Ok(order)
    }

    /// Nodes that belong to a strongly connected component with more than one member.
    fn cycle_members(&self) -> Vec<NodeId> {
        let mut graph = DiGraph::<(), ()>::with_capacity(self.nodes.len(), self.connections.len());
        let indices: Vec<_> = self.nodes.iter().map(|_| graph.add_node(())).collect();
        for connection in &self.connections {
            graph.add_edge(indices[connection.source.0], indices[connection.destination.0], ());
        }

        petgraph::algo::tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .map(|index| NodeId(index.index()))
            .sorted()
            .collect()
    }

    fn invalidate(&mut self) {
        self.order.clear();
        self.ctx = None;
    }

    fn check(&self, node: NodeId) -> Result<(), GraphError> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node))
        }
    }

    /// Set a parameter directly. Only valid while the graph is not being processed.
    ///
    /// Unknown parameter ids are ignored by the module.
    pub fn set_parameter(&mut self, node: NodeId, id: ParamId, value: f32) -> Result<(), GraphError> {
        self.check(node)?;
        self.nodes[node.0].module.set_parameter(id, value);
        Ok(())
    }

    /// Read a parameter. `Ok(None)` for ids the module does not know.
    pub fn get_parameter(&self, node: NodeId, id: ParamId) -> Result<Option<f32>, GraphError> {
        self.check(node)?;
        Ok(self.nodes[node.0].module.get_parameter(id))
    }

    /// Clear the time-varying state of one node.
    pub fn reset_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.check(node)?;
        self.nodes[node.0].module.reset();
        Ok(())
    }

    /// Clear the time-varying state of every node and zero all buffers.
    pub fn reset(&mut self) {
        for node in self.nodes.iter_mut() {
            node.module.reset();
            node.input.fill(0.0);
            node.output.fill(0.0);
        }
    }

    /// Evaluation order, empty until [`init`](Self::init) succeeds.
    pub fn evaluation_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn is_initialized(&self) -> bool {
        self.ctx.is_some()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.ctx.map(|ctx| ctx.sample_rate)
    }

    pub fn block_length(&self) -> Option<usize> {
        self.ctx.map(|ctx| ctx.block_length)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.get(id.0).copied()
    }

    /// Nodes feeding `node`, in connection order.
    pub fn incoming(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.check(node)?;
        Ok(self.nodes[node.0]
            .incoming
            .iter()
            .map(|c| self.connections[c.0].source)
            .collect())
    }

    /// Nodes fed by `node`, in connection order.
    pub fn outgoing(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.check(node)?;
        Ok(self.nodes[node.0]
            .outgoing
            .iter()
            .map(|c| self.connections[c.0].destination)
            .collect())
    }

    /// The node's output buffer from the last cycle.
    pub fn output_of(&self, node: NodeId) -> Option<&[f32]> {
        self.nodes.get(node.0).map(|n| n.output.as_slice())
    }

    /// The node's summed input buffer from the last cycle.
    pub fn input_of(&self, node: NodeId) -> Option<&[f32]> {
        self.nodes.get(node.0).map(|n| n.input.as_slice())
    }

    /// Externally visible channel buffers of a sink node.
    pub fn channels_of(&self, node: NodeId) -> Option<&[Box<[f32]>]> {
        self.nodes.get(node.0).map(|n| n.module.output_channels())
    }
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dc(f32);

    impl Module for Dc {
        fn name(&self) -> &'static str {
            "dc"
        }

        fn process(&mut self, _ctx: &ProcessContext, _input: &[f32], output: &mut [f32]) {
            output.fill(self.0);
        }

        fn set_parameter(&mut self, id: ParamId, value: f32) {
            if id == ParamId(0) {
                self.0 = value;
            }
        }

        fn get_parameter(&self, id: ParamId) -> Option<f32> {
            (id == ParamId(0)).then_some(self.0)
        }
    }

    /// Copies its input.
    struct Through;

    impl Module for Through {
        fn name(&self) -> &'static str {
            "through"
        }

        fn process(&mut self, _ctx: &ProcessContext, input: &[f32], output: &mut [f32]) {
            output.copy_from_slice(input);
        }
    }

    fn position(order: &[NodeId], id: NodeId) -> usize {
        order.iter().position(|n| *n == id).unwrap()
    }

    #[test]
    fn sums_inputs() {
        let mut g = AudioGraph::new();
        let a = g.add_node(Dc(0.25));
        let b = g.add_node(Dc(-0.5));
        let sum = g.add_node(Through);
        g.connect(a, sum).unwrap();
        g.connect(b, sum).unwrap();
        g.init(48000, 16).unwrap();

        g.process(16);
        assert!(g.input_of(sum).unwrap().iter().all(|s| *s == -0.25));
        assert!(g.output_of(sum).unwrap().iter().all(|s| *s == -0.25));
    }

    #[test]
    fn order_ignores_insertion_order() {
        let mut g = AudioGraph::new();
        // added sink-first, the raw insertion order would be wrong
        let out = g.add_node(Through);
        let mid = g.add_node(Through);
        let src = g.add_node(Dc(1.0));
        g.connect(mid, out).unwrap();
        g.connect(src, mid).unwrap();
        g.init(48000, 8).unwrap();

        assert_eq!(g.evaluation_order(), &[src, mid, out]);
        g.process(8);
        assert!(g.output_of(out).unwrap().iter().all(|s| *s == 1.0));
    }

    #[test]
    fn ties_follow_insertion_order() {
        let mut g = AudioGraph::new();
        let a = g.add_node(Dc(1.0));
        let b = g.add_node(Dc(1.0));
        let c = g.add_node(Dc(1.0));
        let sink = g.add_node(Through);
        g.connect(c, sink).unwrap();
        g.connect(a, sink).unwrap();
        g.init(48000, 8).unwrap();
        assert_eq!(g.evaluation_order(), &[a, b, c, sink]);
    }

    #[test]
    fn diamond_respects_predecessors() {
        let mut g = AudioGraph::new();
        let join = g.add_node(Through);
        let left = g.add_node(Through);
        let right = g.add_node(Through);
        let root = g.add_node(Dc(0.5));
        g.connect(root, left).unwrap();
        g.connect(root, right).unwrap();
        g.connect(left, join).unwrap();
        g.connect(right, join).unwrap();
        g.init(44100, 4).unwrap();

        let order = g.evaluation_order();
        assert!(position(order, root) < position(order, left));
        assert!(position(order, root) < position(order, right));
        assert!(position(order, left) < position(order, join));
        assert!(position(order, right) < position(order, join));

        g.process(4);
        assert!(g.output_of(join).unwrap().iter().all(|s| *s == 1.0));
    }

    #[test]
    fn cycle_is_rejected() {
        let mut g = AudioGraph::new();
        let src = g.add_node(Dc(1.0));
        let a = g.add_node(Through);
        let b = g.add_node(Through);
        let tail = g.add_node(Through);
        g.connect(src, a).unwrap();
        g.connect(a, b).unwrap();
        g.connect(b, a).unwrap();
        g.connect(b, tail).unwrap();

        assert_eq!(g.init(48000, 8), Err(GraphError::Cycle { nodes: vec![a, b] }));
        assert!(!g.is_initialized());
        assert!(g.evaluation_order().is_empty());

        // processing an invalid graph is a no-op
        g.process(8);
        assert!(g.output_of(tail).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_connections() {
        let mut g = AudioGraph::new();
        let a = g.add_node(Dc(1.0));
        let b = g.add_node(Through);

        assert_eq!(g.connect(a, a), Err(GraphError::SelfConnection(a)));
        assert_eq!(g.connect(a, NodeId(7)), Err(GraphError::UnknownNode(NodeId(7))));
        g.connect(a, b).unwrap();
        assert_eq!(
            g.connect(a, b),
            Err(GraphError::DuplicateConnection { from: a, to: b })
        );
        assert_eq!(g.connection_count(), 1);
        assert_eq!(g.incoming(b).unwrap(), vec![a]);
        assert_eq!(g.outgoing(a).unwrap(), vec![b]);
    }

    #[test]
    fn init_validates_arguments() {
        let mut g = AudioGraph::new();
        g.add_node(Dc(1.0));
        assert_eq!(g.init(0, 64), Err(GraphError::ZeroSampleRate));
        assert_eq!(g.init(44100, 0), Err(GraphError::ZeroBlockLength));
        assert!(g.init(44100, 64).is_ok());
        assert_eq!(g.output_of(NodeId(0)).unwrap().len(), 64);
    }

    #[test]
    fn topology_change_requires_init() {
        let mut g = AudioGraph::new();
        let a = g.add_node(Dc(1.0));
        g.init(44100, 8).unwrap();
        assert!(g.is_initialized());

        let b = g.add_node(Through);
        assert!(!g.is_initialized());
        g.connect(a, b).unwrap();
        g.init(44100, 8).unwrap();
        assert_eq!(g.evaluation_order(), &[a, b]);
    }

    #[test]
    fn partial_block_leaves_tail_untouched() {
        let mut g = AudioGraph::new();
        let a = g.add_node(Dc(1.0));
        g.init(44100, 8).unwrap();
        g.process(3);
        assert_eq!(g.output_of(a).unwrap(), &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn parameters_and_controller() {
        let mut g = AudioGraph::new();
        let a = g.add_node(Dc(1.0));
        g.init(44100, 4).unwrap();

        g.set_parameter(a, ParamId(0), 0.5).unwrap();
        assert_eq!(g.get_parameter(a, ParamId(0)), Ok(Some(0.5)));
        assert_eq!(g.get_parameter(a, ParamId(9)), Ok(None));
        assert!(g.set_parameter(NodeId(3), ParamId(0), 0.5).is_err());

        let mut control = g.controller(a).unwrap();
        assert_eq!(g.controller(a).err(), Some(GraphError::ControllerTaken(a)));
        control.set(ParamId(0), 0.75).unwrap();

        // queued, not applied until the next cycle
        assert_eq!(g.get_parameter(a, ParamId(0)), Ok(Some(0.5)));
        g.process(4);
        assert_eq!(g.output_of(a).unwrap(), &[0.75; 4]);
    }

    #[test]
    fn renders_mono_output_to_every_channel() {
        let mut g = AudioGraph::new();
        let a = g.add_node(Dc(0.5));
        g.init(44100, 4).unwrap();
        g.process(4);

        let mut frames = [0.0; 8];
        assert_eq!(g.render_interleaved(&mut frames, 2), 4);
        assert_eq!(frames, [0.5; 8]);
    }
}
