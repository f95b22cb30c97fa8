use std::path::Path;

use crate::foundation::error::{PodwaveError, PodwaveResult};

#[derive(Clone, Debug)]
/// Basic metadata about a source audio file.
pub struct AudioSourceInfo {
    /// Total duration in seconds.
    pub duration_secs: f64,
    /// Sample rate of the first audio stream in Hz.
    pub sample_rate: u32,
    /// Channel count of the first audio stream.
    pub channels: u16,
}

#[derive(Clone, Debug)]
/// Decoded floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Mono `f32` PCM samples.
    pub samples: Vec<f32>,
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    std::process::Command::new(tool)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Probe source audio metadata through `ffprobe`.
pub fn probe_audio(source_path: &Path) -> PodwaveResult<AudioSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        sample_rate: Option<String>,
        channels: Option<u16>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: ProbeFormat,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| PodwaveError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(PodwaveError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| PodwaveError::media(format!("ffprobe json parse failed: {e}")))?;

    let audio_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| {
            PodwaveError::media(format!(
                "no audio stream found in '{}'",
                source_path.display()
            ))
        })?;
    let sample_rate = audio_stream
        .sample_rate
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| PodwaveError::media("missing audio sample_rate from ffprobe"))?;
    let channels = audio_stream.channels.unwrap_or(1);

    let duration_secs = parsed
        .format
        .duration
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PodwaveError::media("missing container duration from ffprobe"))?;

    Ok(AudioSourceInfo {
        duration_secs,
        sample_rate,
        channels,
    })
}

/// Probe a media file's duration in seconds through `ffprobe`.
pub fn probe_duration_secs(source_path: &Path) -> PodwaveResult<f64> {
    probe_audio(source_path).map(|info| info.duration_secs)
}

/// Decode source audio to mono `f32` PCM at `sample_rate`.
pub fn decode_audio_f32_mono(path: &Path, sample_rate: u32) -> PodwaveResult<AudioPcm> {
    if sample_rate == 0 {
        return Err(PodwaveError::validation(
            "decode sample_rate must be non-zero",
        ));
    }

    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "1",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| PodwaveError::media(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(PodwaveError::media(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(PodwaveError::media(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut samples = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        samples.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        samples,
    })
}

// No unit tests here: these functions shell out to `ffprobe`/`ffmpeg` and are best validated via
// integration tests that can be conditionally ignored when the tools are unavailable.
