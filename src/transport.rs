//! Producer side of the transport: drives the graph and feeds the ring buffer

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use core::time::Duration;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};

use crate::error::EngineError;
use crate::graph::AudioGraph;
use crate::ring::RingProducer;

/// Counters collected by one run of the transport loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Blocks written to the ring buffer
    pub blocks: u64,
    /// Write attempts that found the ring buffer full
    pub full_retries: u64,
}

/// Settings for [`run_transport`].
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub block_length: usize,
    pub channels: usize,
    /// Sleep between retries while the ring buffer is full
    pub backoff: Duration,
    /// Underrun counter of the matching [`BlockReader`](crate::BlockReader), reported via `tracing`
    pub underruns: Option<Arc<AtomicUsize>>,
}

/// Run the transport loop until `running` is cleared.
///
/// Each cycle processes one block through the graph, interleaves the output
/// node into frames and writes them to the ring buffer, retrying with
/// `backoff` sleeps while it is full. The flag is checked between cycles and
/// between retries; a cycle that has started always completes.
pub fn run_transport(
    graph: &mut AudioGraph,
    producer: &mut RingProducer,
    running: &AtomicBool,
    config: &TransportConfig,
) -> TransportStats {
    let mut block = vec![0.0f32; config.block_length * config.channels];
    let mut stats = TransportStats::default();
    let mut reported_underruns = 0;

    info!(
        block_length = config.block_length,
        channels = config.channels,
        capacity = producer.capacity(),
        "transport started"
    );

    'cycles: while running.load(Ordering::Acquire) {
        graph.process(config.block_length);
        graph.render_interleaved(&mut block, config.channels);

        while let Err(err) = producer.write(&block) {
            if !running.load(Ordering::Acquire) {
                break 'cycles;
            }
            if producer.is_abandoned() {
                warn!("ring buffer consumer dropped, stopping transport");
                break 'cycles;
            }
            stats.full_retries += 1;
            trace!(%err, "ring buffer full, backing off");
            thread::sleep(config.backoff);
        }
        stats.blocks += 1;

        if let Some(counter) = &config.underruns {
            let underruns = counter.load(Ordering::Relaxed);
            if underruns > reported_underruns {
                warn!(total = underruns, new = underruns - reported_underruns, "device underrun");
                reported_underruns = underruns;
            }
        }
    }

    info!(blocks = stats.blocks, full_retries = stats.full_retries, "transport stopped");
    stats
}

/// A transport loop running on its own thread.
///
/// Owns the shared running flag. [`stop`](Self::stop) clears it, joins the
/// thread and hands the graph back to the caller.
pub struct Transport {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<(AudioGraph, TransportStats)>>,
}

impl Transport {
    /// Move `graph` and `producer` to a new thread and start the loop.
    ///
    /// The graph must already be initialized with `config.block_length`.
    pub fn spawn(
        mut graph: AudioGraph,
        mut producer: RingProducer,
        config: TransportConfig,
    ) -> Result<Self, EngineError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let thread = thread::Builder::new()
            .name("keiko-transport".into())
            .spawn(move || {
                let stats = run_transport(&mut graph, &mut producer, &flag, &config);
                (graph, stats)
            })?;

        debug!("transport thread spawned");
        Ok(Self { running, thread: Some(thread) })
    }

    /// The shared running flag. Clearing it stops the loop after the current cycle.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop, wait for the thread and return the graph.
    pub fn stop(mut self) -> Result<(AudioGraph, TransportStats), EngineError> {
        self.running.store(false, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| EngineError::TransportPanicked),
            None => Err(EngineError::TransportPanicked),
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
