use podwave::{
    AudioTrack, Canvas, Color, Fps, InMemorySink, RenderOpts, RenderParams, SegmentSpec,
    build_timeline, render_waveform_range,
};
use std::path::PathBuf;

fn sine_track(duration_secs: f64, sample_rate: u32) -> AudioTrack {
    let count = (duration_secs * f64::from(sample_rate)).round() as usize;
    let samples: Vec<f32> = (0..count)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            (0.6 * (2.0 * std::f64::consts::PI * 220.0 * t).sin()) as f32
        })
        .collect();
    AudioTrack::from_samples(samples, sample_rate).unwrap()
}

fn params(width: u32, height: u32, fps: u32) -> RenderParams {
    RenderParams::new(
        Canvas { width, height },
        Fps::new(fps, 1).unwrap(),
        Color::rgb(0x4E, 0xCD, 0xC4),
        Color::rgb(0x33, 0x33, 0x33),
    )
    .unwrap()
}

#[test]
fn merged_track_renders_expected_frame_count_in_order() {
    // Three narration clips of 1.0s, 2.0s and 1.5s merged into one 4.5s
    // track: at 30fps the video covers exactly ceil(4.5 * 30) = 135 frames.
    let track = sine_track(4.5, 8_000);
    let params = params(640, 360, 30);

    let mut sink = InMemorySink::new();
    let stats = render_waveform_range(
        &track,
        &params,
        &RenderOpts {
            parallel: true,
            workers: Some(4),
            chunk_size: 16,
            channel_capacity: 4,
        },
        &mut sink,
    )
    .unwrap();

    assert_eq!(stats.frames_total, 135);
    assert!(sink.finished());
    assert_eq!(sink.frames().len(), 135);
    for (i, (idx, frame)) in sink.frames().iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 360);
    }

    // The merged-track timeline places segment boundaries at the prefix sums
    // of the clip durations.
    let specs: Vec<SegmentSpec> = [1.0, 2.0, 1.5]
        .iter()
        .enumerate()
        .map(|(i, &d)| SegmentSpec {
            path: PathBuf::from(format!("clip_{i}.mp3")),
            duration_secs: d,
        })
        .collect();
    let timeline = build_timeline(&specs);
    let bounds: Vec<(f64, f64)> = timeline
        .segments
        .iter()
        .map(|s| (s.start_time, s.end_time))
        .collect();
    assert_eq!(bounds, vec![(0.0, 1.0), (1.0, 3.0), (3.0, 4.5)]);
    assert_eq!(timeline.total_duration_secs, 4.5);
}

#[test]
fn parallel_render_is_bitwise_identical_to_sequential() {
    let track = sine_track(1.0, 8_000);
    let params = params(64, 48, 30);

    let mut seq_sink = InMemorySink::new();
    render_waveform_range(
        &track,
        &params,
        &RenderOpts {
            parallel: false,
            ..RenderOpts::default()
        },
        &mut seq_sink,
    )
    .unwrap();

    let mut par_sink = InMemorySink::new();
    render_waveform_range(
        &track,
        &params,
        &RenderOpts {
            parallel: true,
            workers: Some(3),
            chunk_size: 8,
            channel_capacity: 2,
        },
        &mut par_sink,
    )
    .unwrap();

    assert_eq!(seq_sink.frames().len(), 30);
    assert_eq!(seq_sink.frames().len(), par_sink.frames().len());
    for ((idx_a, a), (idx_b, b)) in seq_sink.frames().iter().zip(par_sink.frames().iter()) {
        assert_eq!(idx_a, idx_b);
        assert_eq!(a.data, b.data);
    }
}

#[test]
fn empty_track_produces_zero_frames_and_still_finalizes() {
    let track = AudioTrack::from_samples(Vec::new(), 44_100).unwrap();
    let params = params(64, 48, 30);

    let mut sink = InMemorySink::new();
    let stats =
        render_waveform_range(&track, &params, &RenderOpts::default(), &mut sink).unwrap();

    assert_eq!(stats.frames_total, 0);
    assert!(sink.finished());
    assert!(sink.frames().is_empty());
}
