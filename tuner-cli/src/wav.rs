//! WAV decoding for the command-line host.

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Decoded mono audio.
#[derive(Debug, Clone)]
pub struct Audio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Loads a WAV file as mono `f32` samples in [-1, 1].
///
/// Integer formats are scaled by their bit depth; multi-channel files are
/// averaged down to one channel.
pub fn load_wav(path: &Path) -> Result<Audio> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        bail!("{} declares zero channels", path.display());
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to decode {}", path.display()))?,
        hound::SampleFormat::Int => {
            let max_value = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("failed to decode {}", path.display()))?
        }
    };

    let channels = spec.channels as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    log::info!(
        "Loaded {}: {} samples at {} Hz ({} channel(s))",
        path.display(),
        samples.len(),
        spec.sample_rate,
        channels
    );

    Ok(Audio {
        samples,
        sample_rate: spec.sample_rate,
    })
}
