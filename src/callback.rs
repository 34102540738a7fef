//! Consumer side of the transport, run from the device callback

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::ring::RingConsumer;

/// What a call to [`BlockReader::fill`] delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// New samples from the ring buffer
    Fresh,
    /// Underrun: the last delivered block was repeated
    Repeated,
    /// Underrun before anything was delivered: silence
    Silence,
}

/// Reads blocks for the device callback without ever blocking.
///
/// On underrun the previous block is repeated, or silence is written if
/// nothing has been delivered yet. Underruns are counted in a shared counter
/// so a non-real-time thread can report them.
pub struct BlockReader {
    consumer: RingConsumer,
    last: Box<[f32]>,
    last_len: usize,
    underruns: Arc<AtomicUsize>,
}

impl BlockReader {
    /// `max_block` is the largest request the callback will make.
    pub fn new(consumer: RingConsumer, max_block: usize) -> Self {
        Self {
            consumer,
            last: vec![0.0; max_block].into_boxed_slice(),
            last_len: 0,
            underruns: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fill `out` completely. Never blocks or allocates.
    pub fn fill(&mut self, out: &mut [f32]) -> Delivery {
        if self.consumer.read(out).is_ok() {
            let n = out.len().min(self.last.len());
            self.last[..n].copy_from_slice(&out[..n]);
            self.last_len = n;
            return Delivery::Fresh;
        }

        self.underruns.fetch_add(1, Ordering::Relaxed);
        if self.last_len == 0 {
            out.fill(0.0);
            return Delivery::Silence;
        }

        let n = out.len().min(self.last_len);
        out[..n].copy_from_slice(&self.last[..n]);
        out[n..].fill(0.0);
        Delivery::Repeated
    }

    /// Shared underrun counter, for reporting from another thread.
    pub fn underrun_counter(&self) -> Arc<AtomicUsize> {
        self.underruns.clone()
    }

    pub fn underruns(&self) -> usize {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Largest block whose contents can be repeated on underrun.
    pub fn capacity(&self) -> usize {
        self.last.len()
    }

    /// Samples waiting in the ring buffer.
    pub fn buffered(&self) -> usize {
        self.consumer.available_to_read()
    }
}
