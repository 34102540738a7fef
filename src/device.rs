//! CPAL device discovery and output stream construction

use alloc::string::String;
use alloc::vec::Vec;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SupportedStreamConfig};
use tracing::{error, info};

use crate::callback::BlockReader;
use crate::error::EngineError;

/// A discovered audio output device
pub struct CpalDevice {
    device: cpal::Device,
    config: SupportedStreamConfig,

    name: String,
    sample_rate: u32,
    channels: u16,
}

impl CpalDevice {
    fn from_device(device: cpal::Device) -> Option<Self> {
        let config = device.default_output_config().ok()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Some(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
        })
    }

    /// Get the default output device
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        Self::from_device(host.default_output_device()?)
    }

    /// List all available output devices
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(Self::from_device).collect())
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Build (but do not start) an output stream fed by `reader`.
    ///
    /// The callback converts to the device's sample format; on underrun the
    /// reader's fallback block is played.
    pub fn build_stream(&self, reader: BlockReader) -> Result<cpal::Stream, EngineError> {
        let sample_format = self.config.sample_format();
        let stream_config = self.config.config();
        info!(device = %self.name, ?sample_format, "building output stream");

        let stream = match sample_format {
            SampleFormat::F32 => {
                let mut reader = reader;
                self.device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _| {
                        reader.fill(data);
                    },
                    |err| error!("stream error: {err}"),
                    None,
                )?
            }
            SampleFormat::I16 => self.build_converting(&stream_config, reader, |s| {
                (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
            })?,
            SampleFormat::U16 => self.build_converting(&stream_config, reader, |s| {
                ((s.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16
            })?,
            other => return Err(EngineError::UnsupportedFormat(format!("{other:?}"))),
        };
        Ok(stream)
    }

    /// Stream for integer formats: fill a scratch block, then convert.
    fn build_converting<T, F>(
        &self,
        stream_config: &cpal::StreamConfig,
        mut reader: BlockReader,
        convert: F,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: cpal::SizedSample,
        F: Fn(f32) -> T + Send + 'static,
    {
        // sized once; requests larger than the ring can never be satisfied anyway
        let mut scratch = vec![0.0f32; reader.capacity()];
        self.device.build_output_stream(
            stream_config,
            move |data: &mut [T], _| {
                let n = data.len().min(scratch.len());
                reader.fill(&mut scratch[..n]);
                for (out, &s) in data.iter_mut().zip(&scratch[..n]) {
                    *out = convert(s);
                }
                for out in data[n..].iter_mut() {
                    *out = convert(0.0);
                }
            },
            |err| error!("stream error: {err}"),
            None,
        )
    }
}
