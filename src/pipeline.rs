use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::assets::avatar::load_avatar;
use crate::assets::color::Color;
use crate::assets::media;
use crate::audio::track::AudioTrack;
use crate::encode::ffmpeg::{
    FfmpegSink, FfmpegSinkOpts, concat_audio_filter, concat_videos_copy, ensure_parent_dir,
    extract_audio_wav, extract_silent_video, mux_audio_video,
};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{PodwaveError, PodwaveResult};
use crate::render::params::RenderParams;
use crate::render::scheduler::{RenderOpts, RenderStats, render_waveform_range};

/// Options for [`create_waveform_video`].
#[derive(Clone, Debug)]
pub struct WaveformVideoOpts {
    /// Output canvas dimensions.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Waveform stroke color.
    pub wave_color: Color,
    /// Background fill color.
    pub background_color: Color,
    /// Optional speaker avatar; loading failure is non-fatal.
    pub avatar_path: Option<PathBuf>,
    /// Frame scheduling configuration.
    pub render: RenderOpts,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

impl Default for WaveformVideoOpts {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 1280,
                height: 720,
            },
            fps: Fps { num: 30, den: 1 },
            wave_color: Color::rgb(0x00, 0xFF, 0x00),
            background_color: Color::rgb(0x33, 0x33, 0x33),
            avatar_path: None,
            render: RenderOpts::default(),
            overwrite: true,
        }
    }
}

/// Render an animated waveform video for one narration clip.
///
/// Decodes the audio, renders `ceil(duration * fps)` frames through the
/// parallel scheduler into a temporary silent MP4, then muxes the source
/// audio in. The intermediate silent file is removed on success and kept for
/// inspection when any stage fails.
pub fn create_waveform_video(
    audio_path: &Path,
    out_path: &Path,
    opts: &WaveformVideoOpts,
) -> PodwaveResult<RenderStats> {
    if !media::is_ffmpeg_on_path() {
        return Err(PodwaveError::encode(
            "ffmpeg is required for video rendering, but was not found on PATH",
        ));
    }
    if !media::is_ffprobe_on_path() {
        return Err(PodwaveError::media(
            "ffprobe is required for audio probing, but was not found on PATH",
        ));
    }
    if !audio_path.is_file() {
        return Err(PodwaveError::validation(format!(
            "audio input '{}' does not exist",
            audio_path.display()
        )));
    }
    if !opts.overwrite && out_path.exists() {
        return Err(PodwaveError::validation(format!(
            "output file '{}' already exists",
            out_path.display()
        )));
    }
    ensure_parent_dir(out_path)?;

    let track = AudioTrack::load(audio_path)?;
    if track.duration_secs() <= 0.0 {
        return Err(PodwaveError::validation(
            "audio duration must be greater than zero",
        ));
    }

    let mut params = RenderParams::new(
        opts.canvas,
        opts.fps,
        opts.wave_color,
        opts.background_color,
    )?;
    if let Some(avatar_path) = &opts.avatar_path {
        match load_avatar(avatar_path).and_then(|img| img.prepare(opts.canvas)) {
            Ok(prepared) => params = params.with_avatar(prepared),
            Err(e) => tracing::warn!(
                avatar = %avatar_path.display(),
                error = %e,
                "avatar unavailable; rendering without overlay"
            ),
        }
    }

    let silent_path = unique_temp_path("podwave_silent", "mp4");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&silent_path));

    tracing::info!(
        audio = %audio_path.display(),
        frames = track.total_frames(params.fps()),
        duration_secs = track.duration_secs(),
        "rendering waveform frames"
    );
    let stats = render_waveform_range(&track, &params, &opts.render, &mut sink)?;

    mux_audio_video(&silent_path, audio_path, out_path)?;
    let _ = std::fs::remove_file(&silent_path);

    tracing::info!(
        out = %out_path.display(),
        frames = stats.frames_total,
        workers = stats.workers,
        "waveform video complete"
    );
    Ok(stats)
}

/// Merge an ordered list of episode fragment videos into one MP4.
///
/// Each input is split into a silent video copy and a PCM WAV track; the
/// silent copies are concatenated stream-copying, the audio tracks through
/// the `concat` filter graph, and the two results muxed back together. The
/// working directory is removed on success only.
pub fn merge_videos(videos: &[PathBuf], out_path: &Path) -> PodwaveResult<()> {
    if videos.is_empty() {
        return Err(PodwaveError::validation("video list must not be empty"));
    }
    for video in videos {
        if !video.is_file() {
            return Err(PodwaveError::validation(format!(
                "video input '{}' does not exist",
                video.display()
            )));
        }
    }
    if !media::is_ffmpeg_on_path() {
        return Err(PodwaveError::encode(
            "ffmpeg is required for video merging, but was not found on PATH",
        ));
    }
    ensure_parent_dir(out_path)?;

    let work_dir = unique_temp_path("podwave_merge", "");
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("create merge working directory '{}'", work_dir.display()))?;

    tracing::info!(count = videos.len(), out = %out_path.display(), "merging episode videos");

    let mut silent_videos = Vec::with_capacity(videos.len());
    let mut audio_files = Vec::with_capacity(videos.len());
    for (i, video) in videos.iter().enumerate() {
        let silent = work_dir.join(format!("silent_{i}.mp4"));
        extract_silent_video(video, &silent)?;
        silent_videos.push(silent);

        let audio = work_dir.join(format!("audio_{i}.wav"));
        extract_audio_wav(video, &audio)?;
        audio_files.push(audio);
    }

    let list_path = work_dir.join("video_list.txt");
    let mut list = String::new();
    for silent in &silent_videos {
        let abs = std::fs::canonicalize(silent)
            .with_context(|| format!("resolve silent video path '{}'", silent.display()))?;
        list.push_str(&format!("file '{}'\n", abs.display()));
    }
    std::fs::write(&list_path, list)
        .with_context(|| format!("write video list '{}'", list_path.display()))?;

    let temp_video = work_dir.join("temp_video.mp4");
    concat_videos_copy(&list_path, &temp_video)?;

    let temp_audio = work_dir.join("temp_audio.wav");
    concat_audio_filter(&audio_files, &temp_audio)?;

    mux_audio_video(&temp_video, &temp_audio, out_path)?;

    let _ = std::fs::remove_dir_all(&work_dir);
    tracing::info!(out = %out_path.display(), "episode merge complete");
    Ok(())
}

fn unique_temp_path(prefix: &str, ext: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = if ext.is_empty() {
        format!("{prefix}_{}_{nanos}", std::process::id())
    } else {
        format!("{prefix}_{}_{nanos}.{ext}", std::process::id())
    };
    std::env::temp_dir().join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_audio_input_is_rejected() {
        let err = create_waveform_video(
            Path::new("/nonexistent/podwave/clip.mp3"),
            Path::new("out.mp4"),
            &WaveformVideoOpts::default(),
        )
        .unwrap_err();
        // Either validation (bad path) or a missing-tool error on hosts
        // without ffmpeg/ffprobe; all stop before any rendering.
        assert!(matches!(
            err,
            PodwaveError::Validation(_) | PodwaveError::Encode(_) | PodwaveError::Media(_)
        ));
    }

    #[test]
    fn empty_video_list_is_rejected() {
        let err = merge_videos(&[], Path::new("out.mp4")).unwrap_err();
        assert!(matches!(err, PodwaveError::Validation(_)));
    }

    #[test]
    fn missing_video_input_is_rejected() {
        let err = merge_videos(
            &[PathBuf::from("/nonexistent/podwave/fragment_0.mp4")],
            Path::new("out.mp4"),
        )
        .unwrap_err();
        assert!(matches!(err, PodwaveError::Validation(_)));
    }
}
