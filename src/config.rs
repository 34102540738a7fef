//! Engine configuration

use core::time::Duration;

use crate::error::ConfigError;
use crate::graph::DEFAULT_CONTROL_QUEUE_SIZE;

/// Smallest ring buffer, in blocks, that absorbs producer scheduling jitter.
pub const MIN_RING_BLOCKS: usize = 4;

/// Fixed operating parameters for one run of the engine.
///
/// ```
/// use keiko::EngineConfig;
///
/// let config = EngineConfig::new(48000)
///     .with_block_length(256)
///     .with_channels(1);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.frame_samples(), 256);
/// assert_eq!(config.ring_capacity(), 256 * 8 + 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples per channel per cycle
    pub block_length: usize,
    /// Interleaved output channels
    pub channels: usize,
    /// Ring buffer size, in blocks
    pub ring_blocks: usize,
    /// Sleep between retries while the ring buffer is full
    pub backoff: Duration,
    /// Capacity of each node's control queue
    pub control_queue_size: usize,
}

impl EngineConfig {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn with_block_length(mut self, block_length: usize) -> Self {
        self.block_length = block_length;
        self
    }

    /// Set the number of output channels
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_ring_blocks(mut self, ring_blocks: usize) -> Self {
        self.ring_blocks = ring_blocks;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_control_queue_size(mut self, size: usize) -> Self {
        self.control_queue_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.block_length == 0 {
            return Err(ConfigError::ZeroBlockLength);
        }
        if self.channels == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        if self.ring_blocks < MIN_RING_BLOCKS {
            return Err(ConfigError::RingTooSmall {
                blocks: self.ring_blocks,
                minimum: MIN_RING_BLOCKS,
            });
        }
        Ok(())
    }

    /// Interleaved samples in one block.
    #[inline]
    pub fn frame_samples(&self) -> usize {
        self.block_length * self.channels
    }

    /// Ring buffer slots, including the reserved one.
    #[inline]
    pub fn ring_capacity(&self) -> usize {
        self.frame_samples() * self.ring_blocks + 1
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_length: 128,
            channels: 2,
            ring_blocks: 8,
            backoff: Duration::from_millis(1),
            control_queue_size: DEFAULT_CONTROL_QUEUE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ring_capacity(), 128 * 2 * 8 + 1);
    }

    #[test]
    fn rejects_small_ring() {
        let config = EngineConfig::default().with_ring_blocks(3);
        assert_eq!(
            config.validate(),
            Err(ConfigError::RingTooSmall { blocks: 3, minimum: 4 })
        );
    }

    #[test]
    fn rejects_zero_values() {
        assert_eq!(EngineConfig::new(0).validate(), Err(ConfigError::ZeroSampleRate));
        assert_eq!(
            EngineConfig::default().with_block_length(0).validate(),
            Err(ConfigError::ZeroBlockLength)
        );
        assert_eq!(
            EngineConfig::default().with_channels(0).validate(),
            Err(ConfigError::ZeroChannels)
        );
    }
}
