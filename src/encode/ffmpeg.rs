use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::assets::media::is_ffmpeg_on_path;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{PodwaveError, PodwaveResult};
use crate::render::waveform::FrameRgba;

/// Options for [`FfmpegSink`] silent MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    /// Create options for outputting a silent MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin,
/// producing a silent H.264/yuv420p MP4 (no audio track).
///
/// Audio is attached afterwards with [`mux_audio_video`].
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> PodwaveResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(PodwaveError::validation("fps must be non-zero"));
        }
        if cfg.canvas.width == 0 || cfg.canvas.height == 0 {
            return Err(PodwaveError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.canvas.width.is_multiple_of(2) || !cfg.canvas.height.is_multiple_of(2) {
            return Err(PodwaveError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(PodwaveError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(PodwaveError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if self.opts.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        // Input: raw opaque RGBA8 frames on stdin at the configured rate.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.canvas.width, cfg.canvas.height),
            "-r",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            PodwaveError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PodwaveError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| PodwaveError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> PodwaveResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| PodwaveError::render("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(PodwaveError::render(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.canvas.width || frame.height != cfg.canvas.height {
            return Err(PodwaveError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.canvas.width, cfg.canvas.height
            )));
        }
        let expected = (frame.width as usize) * (frame.height as usize) * 4;
        if frame.data.len() != expected {
            return Err(PodwaveError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(PodwaveError::render("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            PodwaveError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> PodwaveResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| PodwaveError::render("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| PodwaveError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PodwaveError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| PodwaveError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(PodwaveError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }
}

/// Combine a silent video container and an audio file into the final
/// deliverable.
///
/// The video stream is copied unmodified; audio is encoded to AAC; output is
/// truncated to the shorter of the two inputs. On success the caller is
/// responsible for removing the intermediate silent video.
pub fn mux_audio_video(video_path: &Path, audio_path: &Path, out_path: &Path) -> PodwaveResult<()> {
    if !video_path.exists() {
        return Err(PodwaveError::validation(format!(
            "mux video input '{}' does not exist",
            video_path.display()
        )));
    }
    if !audio_path.exists() {
        return Err(PodwaveError::validation(format!(
            "mux audio input '{}' does not exist",
            audio_path.display()
        )));
    }
    ensure_parent_dir(out_path)?;

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-i"])
        .arg(video_path)
        .arg("-i")
        .arg(audio_path)
        .args([
            "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-b:a", "192k",
            "-shortest", "-y",
        ])
        .arg(out_path);
    run_tool(cmd, "ffmpeg audio/video mux")
}

/// Copy the video stream of `in_path` into a new container with no audio.
pub fn extract_silent_video(in_path: &Path, out_path: &Path) -> PodwaveResult<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-i"])
        .arg(in_path)
        .args(["-c:v", "copy", "-an", "-y"])
        .arg(out_path);
    run_tool(cmd, "ffmpeg silent-video extract")
}

/// Extract the audio track of `in_path` as PCM WAV.
pub fn extract_audio_wav(in_path: &Path, out_path: &Path) -> PodwaveResult<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-i"])
        .arg(in_path)
        .args(["-vn", "-acodec", "pcm_s16le", "-y"])
        .arg(out_path);
    run_tool(cmd, "ffmpeg audio extract")
}

/// Concatenate the containers named by an existing concat list file,
/// stream-copying (no re-encode).
pub fn concat_videos_copy(list_path: &Path, out_path: &Path) -> PodwaveResult<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(list_path)
        .args(["-c", "copy", "-y"])
        .arg(out_path);
    run_tool(cmd, "ffmpeg video concat")
}

/// Concatenate the audio files named by an existing concat list file,
/// re-encoding to normalize sample rate, channel count and bitrate across
/// heterogeneous inputs.
pub fn concat_audio_reencode(
    list_path: &Path,
    sample_rate: u32,
    channels: u16,
    bitrate: &str,
    out_path: &Path,
) -> PodwaveResult<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(list_path)
        .args([
            "-ar",
            &sample_rate.to_string(),
            "-ac",
            &channels.to_string(),
            "-b:a",
            bitrate,
        ])
        .arg(out_path);
    run_tool(cmd, "ffmpeg audio concat")
}

/// Stamp an ffmetadata chapter file onto a container, stream-copying.
pub fn stamp_chapter_metadata(
    in_path: &Path,
    metadata_path: &Path,
    out_path: &Path,
) -> PodwaveResult<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-y", "-i"])
        .arg(in_path)
        .arg("-i")
        .arg(metadata_path)
        .args(["-map_metadata", "1", "-codec", "copy"])
        .arg(out_path);
    run_tool(cmd, "ffmpeg chapter metadata stamp")
}

/// Concatenate audio files through the `concat` filter graph.
pub fn concat_audio_filter(inputs: &[PathBuf], out_path: &Path) -> PodwaveResult<()> {
    if inputs.is_empty() {
        return Err(PodwaveError::validation(
            "audio filter concat requires at least one input",
        ));
    }

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error"]);
    for input in inputs {
        cmd.arg("-i").arg(input);
    }
    let mut filter = String::new();
    for i in 0..inputs.len() {
        filter.push_str(&format!("[{i}:0]"));
    }
    filter.push_str(&format!("concat=n={}:v=0:a=1[outa]", inputs.len()));
    cmd.args(["-filter_complex", &filter, "-map", "[outa]", "-y"])
        .arg(out_path);
    run_tool(cmd, "ffmpeg audio filter concat")
}

fn run_tool(mut cmd: Command, what: &str) -> PodwaveResult<()> {
    let out = cmd
        .output()
        .map_err(|e| PodwaveError::encode(format!("failed to run {what}: {e}")))?;
    if !out.status.success() {
        return Err(PodwaveError::encode(format!(
            "{what} exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> PodwaveResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
