//! Output sink

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::node::{Module, ProcessContext};

/// Terminal node that exposes its input as one or more channel buffers
///
/// Mono input is copied to every channel. The transport reads the channels
/// after each cycle through [`Module::output_channels`]. The input is also
/// copied to the node's own output so downstream inspection works the same
/// as for any other node.
pub struct Output {
    channels: Vec<Box<[f32]>>,
    channel_count: usize,
}

impl Output {
    /// Create a sink with `channels` channels (at least one).
    pub fn new(channels: usize) -> Self {
        Self {
            channels: Vec::new(),
            channel_count: channels.max(1),
        }
    }

    pub fn mono() -> Self {
        Self::new(1)
    }

    pub fn stereo() -> Self {
        Self::new(2)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }
}

impl Module for Output {
    fn name(&self) -> &'static str {
        "output"
    }

    fn init(&mut self, ctx: &ProcessContext) {
        self.channels = (0..self.channel_count)
            .map(|_| vec![0.0; ctx.block_length].into_boxed_slice())
            .collect();
    }

    fn process(&mut self, _ctx: &ProcessContext, input: &[f32], output: &mut [f32]) {
        let n = input.len();
        for channel in self.channels.iter_mut() {
            channel[..n].copy_from_slice(input);
        }
        output.copy_from_slice(input);
    }

    fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.fill(0.0);
        }
    }

    fn output_channels(&self) -> &[Box<[f32]>] {
        &self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcasts_to_every_channel() {
        let ctx = ProcessContext { sample_rate: 48000, block_length: 4 };
        let mut sink = Output::new(3);
        assert!(sink.output_channels().is_empty());

        sink.init(&ctx);
        let mut out = [0.0; 4];
        sink.process(&ctx, &[0.1, 0.2, 0.3, 0.4], &mut out);

        assert_eq!(sink.output_channels().len(), 3);
        for channel in sink.output_channels() {
            assert_eq!(&channel[..], &[0.1, 0.2, 0.3, 0.4]);
        }
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn zero_channels_becomes_mono() {
        assert_eq!(Output::new(0).channel_count(), 1);
    }
}
