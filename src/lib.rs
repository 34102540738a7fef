//! A small real-time audio graph with a lock-free block transport.
//!
//! - [`AudioGraph`] owns [`Module`] nodes and their connections, orders them
//!   topologically and sums each node's sources into its input every cycle.
//! - [`SampleRing`] moves interleaved sample blocks from the transport thread
//!   to the device callback without locks.
//! - [`Transport`] runs the graph on its own thread and feeds the ring;
//!   [`BlockReader`] drains it from the callback and never blocks.
//! - [`Engine`] wires all of the above from one [`EngineConfig`].
//!
//! With the `cpal_sink` feature, [`CpalDevice`] opens a system output stream.

extern crate alloc;

mod callback;
mod config;
#[cfg(feature = "cpal_sink")]
mod device;
mod engine;
mod error;
mod graph;
mod node;
pub mod nodes;
mod ring;
mod transport;

pub use callback::{BlockReader, Delivery};
pub use config::{EngineConfig, MIN_RING_BLOCKS};
#[cfg(feature = "cpal_sink")]
pub use device::CpalDevice;
#[cfg(feature = "cpal_sink")]
pub use engine::Playback;
pub use engine::{Engine, RunningEngine};
pub use error::{ConfigError, EngineError, GraphError, RingError};
pub use graph::{AudioGraph, Connection, Controller, DEFAULT_CONTROL_QUEUE_SIZE};
pub use node::{ConnectionId, Module, NodeId, ParamChange, ParamId, ProcessContext};
pub use ring::{RingConsumer, RingProducer, SampleRing};
pub use transport::{run_transport, Transport, TransportConfig, TransportStats};
