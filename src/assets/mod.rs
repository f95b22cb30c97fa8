//! Asset loading and the media collaborator boundary.

/// Speaker avatar decode, resize and circular-mask preparation.
pub mod avatar;
/// Colors for waveform strokes and backgrounds.
pub mod color;
/// `ffprobe`/`ffmpeg` probing and PCM decoding.
pub mod media;
