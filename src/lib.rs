//! Podwave renders podcast-style animated waveform videos.
//!
//! The pipeline is built from three operations:
//!
//! - Merge narration clips into one track with chapter markers and a
//!   machine-readable timeline ([`concat_audio`])
//! - Render an amplitude-driven waveform visualization for a clip, computing
//!   frames on a worker pool and streaming them in strict index order into an
//!   `ffmpeg`-backed sink ([`create_waveform_video`])
//! - Assemble per-clip fragment videos into one episode ([`merge_videos`])
//!
//! Frame rendering is pure and deterministic; all `ffmpeg`/`ffprobe`
//! invocations are synchronous subprocess calls behind narrow seams.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Asset loading and the media collaborator boundary.
pub mod assets;
/// Audio data owned by render jobs.
pub mod audio;
/// Encoding sinks and `ffmpeg` container operations.
pub mod encode;
/// Job orchestration: waveform video jobs and episode assembly.
pub mod pipeline;
/// Frame rendering: parameters, rasterizer, parallel scheduler.
pub mod render;
/// Merge timelines, chapter metadata and sidecars.
pub mod timeline;

pub use crate::foundation::core::{Canvas, FrameIndex, FrameRange, Fps, format_hms};
pub use crate::foundation::error::{PodwaveError, PodwaveResult};

pub use crate::assets::color::Color;
pub use crate::audio::track::AudioTrack;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::pipeline::{WaveformVideoOpts, create_waveform_video, merge_videos};
pub use crate::render::params::RenderParams;
pub use crate::render::scheduler::{RenderOpts, RenderStats, render_frames, render_waveform_range};
pub use crate::render::waveform::{FrameRgba, render_waveform_frame};
pub use crate::timeline::builder::{SegmentSpec, Timeline, TimelineSegment, build_timeline};
pub use crate::timeline::concat::{ConcatManifest, ConcatOpts, concat_audio};
