use std::path::Path;
use std::sync::Arc;

use crate::assets::media;
use crate::foundation::core::Fps;
use crate::foundation::error::{PodwaveError, PodwaveResult};

/// Immutable mono audio track owned by one render job.
///
/// Samples are normalized floating-point amplitudes (roughly [-1, 1]) behind
/// an `Arc`, so broadcasting the track to pool workers is a cheap clone and
/// the data is never copied or mutated after load.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl AudioTrack {
    /// Build a track from raw mono samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> PodwaveResult<Self> {
        if sample_rate == 0 {
            return Err(PodwaveError::validation(
                "audio track sample_rate must be non-zero",
            ));
        }
        Ok(Self {
            samples: Arc::new(samples),
            sample_rate,
        })
    }

    /// Decode a source file into a mono track at its native sample rate.
    pub fn load(path: &Path) -> PodwaveResult<Self> {
        let info = media::probe_audio(path)?;
        let pcm = media::decode_audio_f32_mono(path, info.sample_rate)?;
        Self::from_samples(pcm.samples, pcm.sample_rate)
    }

    /// Borrow the sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples in the track.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Track duration in seconds (`sample_count / sample_rate`).
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Total output frame count at `fps`, using ceil semantics.
    pub fn total_frames(&self, fps: Fps) -> u64 {
        fps.secs_to_frames_ceil(self.duration_secs())
    }
}
