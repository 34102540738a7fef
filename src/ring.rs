//! Lock-free single-producer/single-consumer sample ring buffer.
//!
//! [`SampleRing::new`] returns a [`RingProducer`] and a [`RingConsumer`].
//! Each half can be moved to its own thread; neither can be cloned, so the
//! one-writer/one-reader discipline is enforced by ownership.
//!
//! Transfers are all-or-nothing: a write that does not fit, or a read that
//! asks for more than is available, moves nothing and returns an error that
//! carries the current fill level.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RingError;

struct Shared {
    buffer: Box<[UnsafeCell<f32>]>,
    /// Next slot the consumer reads. Advanced only by the consumer.
    read: AtomicUsize,
    /// Next slot the producer writes. Advanced only by the producer.
    write: AtomicUsize,
}

// Slots in [read, write) belong to the consumer, the rest to the producer.
// The cursor protocol below keeps the two regions disjoint.
unsafe impl Sync for Shared {}

impl Shared {
    #[inline]
    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    fn base(&self) -> *mut f32 {
        // UnsafeCell<f32> is repr(transparent)
        self.buffer.as_ptr() as *mut f32
    }
}

#[inline]
fn readable(read: usize, write: usize, capacity: usize) -> usize {
    if write >= read {
        write - read
    } else {
        capacity - read + write
    }
}

#[inline]
fn writable(read: usize, write: usize, capacity: usize) -> usize {
    // one slot stays empty so that `read == write` always means "empty"
    capacity - 1 - readable(read, write, capacity)
}

/// Constructor namespace for the ring buffer halves.
pub struct SampleRing;

impl SampleRing {
    /// Allocate a ring with `capacity` slots, `capacity - 1` of which are usable.
    pub fn new(capacity: usize) -> Result<(RingProducer, RingConsumer), RingError> {
        if capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }

        let buffer = (0..capacity).map(|_| UnsafeCell::new(0.0)).collect();
        let shared = Arc::new(Shared {
            buffer,
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
        });

        Ok((
            RingProducer { shared: shared.clone() },
            RingConsumer { shared },
        ))
    }
}

/// The writing half of a [`SampleRing`].
pub struct RingProducer {
    shared: Arc<Shared>,
}

impl RingProducer {
    /// Write all of `data`, or nothing.
    ///
    /// Returns [`RingError::Full`] when fewer than `data.len()` slots are free.
    pub fn write(&mut self, data: &[f32]) -> Result<(), RingError> {
        let n = data.len();
        if n == 0 {
            return Ok(());
        }

        let shared = &*self.shared;
        let capacity = shared.capacity();
        let read = shared.read.load(Ordering::Acquire);
        let write = shared.write.load(Ordering::Relaxed);

        let available = writable(read, write, capacity);
        if available < n {
            return Err(RingError::Full { requested: n, available });
        }

        let first = n.min(capacity - write);
        // Safety: the `available` slots starting at `write` are not visible to
        // the consumer until the cursor store below, and `first + (n - first)`
        // stays within them.
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), shared.base().add(write), first);
            ptr::copy_nonoverlapping(data.as_ptr().add(first), shared.base(), n - first);
        }

        shared.write.store((write + n) % capacity, Ordering::Release);
        Ok(())
    }

    /// Free slots, as seen by the producer.
    #[inline]
    pub fn available_to_write(&self) -> usize {
        let shared = &*self.shared;
        writable(
            shared.read.load(Ordering::Acquire),
            shared.write.load(Ordering::Relaxed),
            shared.capacity(),
        )
    }

    /// Unread samples, as seen by the producer.
    #[inline]
    pub fn available_to_read(&self) -> usize {
        let shared = &*self.shared;
        readable(
            shared.read.load(Ordering::Acquire),
            shared.write.load(Ordering::Relaxed),
            shared.capacity(),
        )
    }

    /// Total slots, including the one reserved slot.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Whether the consumer half has been dropped.
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.shared) < 2
    }
}

/// The reading half of a [`SampleRing`].
pub struct RingConsumer {
    shared: Arc<Shared>,
}

impl RingConsumer {
    /// Fill all of `data`, or nothing.
    ///
    /// Returns [`RingError::Empty`] when fewer than `data.len()` samples are
    /// available; `data` is left untouched in that case.
    pub fn read(&mut self, data: &mut [f32]) -> Result<(), RingError> {
        let n = data.len();
        if n == 0 {
            return Ok(());
        }

        let shared = &*self.shared;
        let capacity = shared.capacity();
        let write = shared.write.load(Ordering::Acquire);
        let read = shared.read.load(Ordering::Relaxed);

        let available = readable(read, write, capacity);
        if available < n {
            return Err(RingError::Empty { requested: n, available });
        }

        let first = n.min(capacity - read);
        // Safety: the acquire load above makes the producer's writes to the
        // `available` slots starting at `read` visible, and the producer will
        // not touch them until the cursor store below.
        unsafe {
            ptr::copy_nonoverlapping(shared.base().add(read), data.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(shared.base(), data.as_mut_ptr().add(first), n - first);
        }

        shared.read.store((read + n) % capacity, Ordering::Release);
        Ok(())
    }

    /// Unread samples, as seen by the consumer.
    #[inline]
    pub fn available_to_read(&self) -> usize {
        let shared = &*self.shared;
        readable(
            shared.read.load(Ordering::Relaxed),
            shared.write.load(Ordering::Acquire),
            shared.capacity(),
        )
    }

    /// Free slots, as seen by the consumer.
    #[inline]
    pub fn available_to_write(&self) -> usize {
        let shared = &*self.shared;
        writable(
            shared.read.load(Ordering::Relaxed),
            shared.write.load(Ordering::Acquire),
            shared.capacity(),
        )
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Whether the producer half has been dropped.
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.shared) < 2
    }
}
