use std::collections::HashMap;
use std::sync::mpsc;

use rayon::prelude::*;

use crate::audio::track::AudioTrack;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{PodwaveError, PodwaveResult};
use crate::render::params::RenderParams;
use crate::render::waveform::{FrameRgba, render_waveform_frame};

/// Hard cap on reorder-buffer memory, independent of chunk configuration.
const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// Options controlling parallel frame scheduling.
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Enable frame-level parallelism (dedicated rayon pool).
    pub parallel: bool,
    /// Worker pool size. `None` uses `max(1, available_parallelism - 1)`,
    /// leaving one core for the control thread and the encoder subprocess.
    pub workers: Option<usize>,
    /// Frames dispatched per scheduling chunk; bounds how far completed
    /// frames can run ahead of the write watermark.
    pub chunk_size: usize,
    /// Bounded channel capacity between render workers and the encoder
    /// thread.
    pub channel_capacity: usize,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            workers: None,
            chunk_size: 64,
            channel_capacity: 4,
        }
    }
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Total frames written to the sink.
    pub frames_total: u64,
    /// Worker pool size used for the job (1 for sequential renders).
    pub workers: usize,
}

/// Render `range` through `render` and stream the frames into `sink` in
/// strictly increasing frame-index order.
///
/// Frame computation is unordered: workers may complete frames in any order,
/// and a reorder buffer on the encoder thread restores index order before the
/// sink sees them. The sink's `end` runs only after every frame was pushed;
/// any worker failure stops submission, tears the pool down, and propagates
/// without finalizing the sink.
pub fn render_frames<F>(
    range: FrameRange,
    cfg: SinkConfig,
    opts: &RenderOpts,
    render: F,
    sink: &mut dyn FrameSink,
) -> PodwaveResult<RenderStats>
where
    F: Fn(FrameIndex) -> PodwaveResult<FrameRgba> + Sync,
{
    if range.is_empty() {
        sink.begin(cfg)?;
        sink.end()?;
        return Ok(RenderStats {
            frames_total: 0,
            workers: 1,
        });
    }

    if !opts.parallel {
        sink.begin(cfg)?;
        for f in range.start.0..range.end.0 {
            let frame = render(FrameIndex(f))?;
            sink.push_frame(FrameIndex(f), &frame)?;
        }
        sink.end()?;
        return Ok(RenderStats {
            frames_total: range.len_frames(),
            workers: 1,
        });
    }

    let workers = resolve_workers(opts.workers)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| PodwaveError::render(format!("failed to build rayon thread pool: {e}")))?;

    let bytes_per_frame = (u64::from(cfg.canvas.width))
        .saturating_mul(u64::from(cfg.canvas.height))
        .saturating_mul(4)
        .max(1);
    let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
    let chunk_size = normalized_chunk_size(opts.chunk_size).min(max_chunk_by_mem);

    let cap = opts.channel_capacity.max(1);
    let range_start = range.start.0;
    let range_end = range.end.0;

    // Encoder thread: enforce in-order delivery to the sink regardless of
    // worker completion order.
    std::thread::scope(|scope| -> PodwaveResult<RenderStats> {
        let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
        let cfg_enc = cfg.clone();
        let sink_ref: &mut dyn FrameSink = sink;

        let enc = scope.spawn(move || -> PodwaveResult<()> {
            sink_ref.begin(cfg_enc)?;

            let mut next = range_start;
            let mut pending = HashMap::<u64, FrameRgba>::new();
            while next < range_end {
                if let Some(frame) = pending.remove(&next) {
                    sink_ref.push_frame(FrameIndex(next), &frame)?;
                    next += 1;
                    continue;
                }

                let msg = rx.recv().map_err(|_| {
                    PodwaveError::render("encoder channel disconnected before all frames arrived")
                })?;
                pending.insert(msg.idx.0, msg.frame);

                while let Some(frame) = pending.remove(&next) {
                    sink_ref.push_frame(FrameIndex(next), &frame)?;
                    next += 1;
                    if next >= range_end {
                        break;
                    }
                }
            }
            debug_assert!(pending.is_empty());

            sink_ref.end()?;
            Ok(())
        });

        let produce_res = (|| -> PodwaveResult<()> {
            let mut chunk_start = range_start;
            while chunk_start < range_end {
                let chunk_end = (chunk_start + chunk_size).min(range_end);
                pool.install(|| {
                    (chunk_start..chunk_end)
                        .into_par_iter()
                        .try_for_each(|f| -> PodwaveResult<()> {
                            let frame = render(FrameIndex(f))?;
                            tx.send(FrameMsg {
                                idx: FrameIndex(f),
                                frame,
                            })
                            .map_err(|_| {
                                PodwaveError::render("encoder thread is not accepting frames")
                            })
                        })
                })?;
                chunk_start = chunk_end;
            }
            Ok(())
        })();

        drop(tx);
        let enc_res = enc
            .join()
            .map_err(|_| PodwaveError::render("encoder thread panicked"))?;

        // A producer failure is the root cause; the encoder's disconnect
        // error is a symptom of the teardown.
        if let Err(e) = produce_res {
            let _ = enc_res;
            return Err(e);
        }
        enc_res?;

        Ok(RenderStats {
            frames_total: range.len_frames(),
            workers,
        })
    })
}

/// Render a full waveform job (frames `0..total_frames`) into `sink`.
///
/// The track samples and render parameters are broadcast read-only to every
/// worker; per-frame computation is the pure
/// [`render_waveform_frame`](crate::render::waveform::render_waveform_frame).
pub fn render_waveform_range(
    track: &AudioTrack,
    params: &RenderParams,
    opts: &RenderOpts,
    sink: &mut dyn FrameSink,
) -> PodwaveResult<RenderStats> {
    let total_frames = track.total_frames(params.fps());
    let range = FrameRange::new(FrameIndex(0), FrameIndex(total_frames))?;
    let cfg = SinkConfig {
        canvas: params.canvas(),
        fps: params.fps(),
    };
    render_frames(
        range,
        cfg,
        opts,
        |frame| Ok(render_waveform_frame(track, params, total_frames, frame)),
        sink,
    )
}

fn resolve_workers(workers: Option<usize>) -> PodwaveResult<usize> {
    match workers {
        Some(0) => Err(PodwaveError::validation(
            "render 'workers' must be >= 1 when set",
        )),
        Some(n) => Ok(n),
        None => {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            Ok((cores.saturating_sub(1)).max(1))
        }
    }
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 { 1 } else { chunk_size as u64 }
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: FrameRgba,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::sink::InMemorySink;
    use crate::foundation::core::{Canvas, Fps};

    fn test_cfg() -> SinkConfig {
        SinkConfig {
            canvas: Canvas {
                width: 2,
                height: 2,
            },
            fps: Fps::new(30, 1).unwrap(),
        }
    }

    fn tagged_frame(f: FrameIndex) -> FrameRgba {
        // Encode the frame index into the pixel data so ordering mix-ups are
        // visible in payload comparisons, not just in indexes.
        FrameRgba {
            width: 2,
            height: 2,
            data: vec![(f.0 % 251) as u8; 16],
        }
    }

    fn opts(workers: usize, chunk_size: usize) -> RenderOpts {
        RenderOpts {
            parallel: true,
            workers: Some(workers),
            chunk_size,
            channel_capacity: 4,
        }
    }

    #[test]
    fn writes_all_frames_in_order_despite_random_completion_latency() {
        let range = FrameRange::new(FrameIndex(0), FrameIndex(97)).unwrap();
        let mut sink = InMemorySink::new();

        let stats = render_frames(
            range,
            test_cfg(),
            &opts(4, 8),
            |f| {
                // Skew completion order: later frames in each chunk finish first.
                std::thread::sleep(std::time::Duration::from_micros((f.0 * 37) % 900));
                Ok(tagged_frame(f))
            },
            &mut sink,
        )
        .unwrap();

        assert_eq!(stats.frames_total, 97);
        assert!(sink.finished());
        assert_eq!(sink.frames().len(), 97);
        for (i, (idx, frame)) in sink.frames().iter().enumerate() {
            assert_eq!(idx.0, i as u64);
            assert_eq!(frame.data, tagged_frame(FrameIndex(i as u64)).data);
        }
    }

    #[test]
    fn empty_range_finalizes_with_zero_frames() {
        let range = FrameRange::new(FrameIndex(0), FrameIndex(0)).unwrap();
        let mut sink = InMemorySink::new();
        let stats =
            render_frames(range, test_cfg(), &opts(2, 8), |f| Ok(tagged_frame(f)), &mut sink)
                .unwrap();
        assert_eq!(stats.frames_total, 0);
        assert!(sink.finished());
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn worker_failure_propagates_and_never_finalizes_the_sink() {
        let range = FrameRange::new(FrameIndex(0), FrameIndex(60)).unwrap();
        let mut sink = InMemorySink::new();

        let err = render_frames(
            range,
            test_cfg(),
            &opts(4, 8),
            |f| {
                if f.0 == 23 {
                    return Err(PodwaveError::render("injected frame failure"));
                }
                Ok(tagged_frame(f))
            },
            &mut sink,
        )
        .unwrap_err();

        assert!(err.to_string().contains("injected frame failure"));
        assert!(!sink.finished());
        // Whatever was written before the failure is still strictly ordered.
        for (i, (idx, _)) in sink.frames().iter().enumerate() {
            assert_eq!(idx.0, i as u64);
        }
    }

    #[test]
    fn sequential_and_parallel_deliver_identical_streams() {
        let range = FrameRange::new(FrameIndex(0), FrameIndex(40)).unwrap();

        let mut seq_sink = InMemorySink::new();
        render_frames(
            range,
            test_cfg(),
            &RenderOpts {
                parallel: false,
                ..RenderOpts::default()
            },
            |f| Ok(tagged_frame(f)),
            &mut seq_sink,
        )
        .unwrap();

        let mut par_sink = InMemorySink::new();
        render_frames(
            range,
            test_cfg(),
            &opts(3, 16),
            |f| Ok(tagged_frame(f)),
            &mut par_sink,
        )
        .unwrap();

        assert_eq!(seq_sink.frames().len(), par_sink.frames().len());
        for ((idx_a, a), (idx_b, b)) in seq_sink.frames().iter().zip(par_sink.frames().iter()) {
            assert_eq!(idx_a, idx_b);
            assert_eq!(a.data, b.data);
        }
    }

    #[test]
    fn zero_workers_is_rejected() {
        let range = FrameRange::new(FrameIndex(0), FrameIndex(4)).unwrap();
        let mut sink = InMemorySink::new();
        let err = render_frames(
            range,
            test_cfg(),
            &opts(0, 8),
            |f| Ok(tagged_frame(f)),
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, PodwaveError::Validation(_)));
    }
}
