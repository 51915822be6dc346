use std::{io::Read, path::Path};

use crate::{BeatlaneError, Result};

/// Decoded mono audio handed to chart generation.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Opens a WAV file and keeps its first channel.
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        Self::decode(reader)
    }

    /// Decodes WAV data from any reader, keeping the first channel.
    pub fn from_wav_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = hound::WavReader::new(reader)?;
        Self::decode(reader)
    }

    fn decode<R: Read>(reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_val))
                    .collect::<std::result::Result<_, _>>()?
            }
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
        };

        let samples = interleaved.into_iter().step_by(channels).collect();
        tracing::debug!(
            sample_rate = spec.sample_rate,
            channels,
            bits = spec.bits_per_sample,
            "decoded wav stream"
        );
        Ok(Self::new(samples, spec.sample_rate))
    }

    /// Track length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Checks the preconditions chart generation relies on.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(BeatlaneError::InvalidAudio("sample rate must be positive"));
        }
        if self.samples.iter().any(|s| !s.is_finite()) {
            return Err(BeatlaneError::InvalidAudio("samples must be finite"));
        }
        Ok(())
    }
}
