use crate::foundation::core::{Canvas, FrameIndex, Fps};
use crate::foundation::error::PodwaveResult;
use crate::render::waveform::FrameRgba;

/// Configuration provided to a [`FrameSink`] at the start of a render job.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output canvas dimensions.
    pub canvas: Canvas,
    /// Output frames-per-second.
    pub fps: Fps,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing
/// `FrameIndex` order. `end` is only called after every frame of a successful
/// job has been pushed; a failed job drops the sink without finalizing it, so
/// partial output is never marked complete.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> PodwaveResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> PodwaveResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> PodwaveResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    finished: bool,
    /// Frames in timeline order.
    pub(crate) frames: Vec<(FrameIndex, FrameRgba)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRgba)] {
        &self.frames
    }

    /// Whether `end` ran (the job was finalized as complete).
    pub fn finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> PodwaveResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> PodwaveResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> PodwaveResult<()> {
        self.finished = true;
        Ok(())
    }
}
