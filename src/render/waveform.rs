use std::f64::consts::PI;

use crate::audio::track::AudioTrack;
use crate::foundation::core::FrameIndex;
use crate::render::params::RenderParams;

/// A rendered frame as opaque straight-alpha RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

/// Fixed gain applied to raw sample amplitudes before the height cap.
const AMPLITUDE_GAIN: f64 = 4.0;
/// Peak curve height as a fraction of the frame height.
const MAX_AMPLITUDE_RATIO: f64 = 0.4;
/// Spatial phase span of the sinusoid across the frame width (four cycles).
const PHASE_SPAN: f64 = 8.0 * PI;
/// Stroke width of the rasterized curve in pixels.
const STROKE_PX: u32 = 2;

/// Render one waveform frame.
///
/// Pure and deterministic: repeated calls with identical inputs produce
/// bit-identical output, which makes frames safe to recompute on any worker.
///
/// The visualization is a fixed-phase sinusoid spanning the frame width whose
/// peak height follows the loudness at this frame's sample position — a
/// pulsing curve, not a scrolling oscillogram. A sample position past the end
/// of the track renders as a flat line.
pub fn render_waveform_frame(
    track: &AudioTrack,
    params: &RenderParams,
    total_frames: u64,
    frame: FrameIndex,
) -> FrameRgba {
    let canvas = params.canvas();
    let width = canvas.width;
    let height = canvas.height;

    let mut data = vec![0u8; (width as usize) * (height as usize) * 4];
    let bg = params.background_color().to_rgba8();
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&bg);
    }

    let amplitude_px = frame_amplitude_px(track, total_frames, frame, height);

    let center_y = i64::from(height / 2);
    let wave = params.wave_color().to_rgba8();
    let mut prev: Option<(i64, i64)> = None;
    for x in 0..width {
        let phase = f64::from(x) / f64::from(width) * PHASE_SPAN;
        let y_offset = (amplitude_px * phase.sin()) as i64;
        let y = (center_y + y_offset).clamp(0, i64::from(height) - 1);
        let point = (i64::from(x), y);
        if let Some(prev) = prev {
            draw_line(&mut data, width, height, prev, point, wave);
        }
        prev = Some(point);
    }

    if let Some(avatar) = params.avatar() {
        avatar.composite_onto(&mut data, width);
    }

    FrameRgba {
        width,
        height,
        data,
    }
}

/// Peak curve height in pixels for `frame`.
///
/// The frame maps to `floor(frame * total_samples / total_frames)`; positions
/// past the end of the track (possible at the last frame after rounding) are
/// silent rather than an error.
fn frame_amplitude_px(
    track: &AudioTrack,
    total_frames: u64,
    frame: FrameIndex,
    height: u32,
) -> f64 {
    if total_frames == 0 {
        return 0.0;
    }
    let total_samples = track.sample_count() as u64;
    let current_sample =
        ((u128::from(frame.0) * u128::from(total_samples)) / u128::from(total_frames)) as u64;

    let Some(&sample) = track.samples().get(current_sample as usize) else {
        return 0.0;
    };

    let max_amplitude = f64::from(height) * MAX_AMPLITUDE_RATIO;
    (f64::from(sample.abs()) * AMPLITUDE_GAIN * max_amplitude).min(max_amplitude)
}

/// Rasterize a line segment with a [`STROKE_PX`]-wide stamp (Bresenham).
fn draw_line(
    data: &mut [u8],
    width: u32,
    height: u32,
    from: (i64, i64),
    to: (i64, i64),
    rgba: [u8; 4],
) {
    let (mut x, mut y) = from;
    let (x1, y1) = to;

    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(data, width, height, x, y, rgba);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn stamp(data: &mut [u8], width: u32, height: u32, x: i64, y: i64, rgba: [u8; 4]) {
    let half = i64::from(STROKE_PX / 2);
    for oy in -half..i64::from(STROKE_PX) - half {
        for ox in -half..i64::from(STROKE_PX) - half {
            let px = x + ox;
            let py = y + oy;
            if px < 0 || py < 0 || px >= i64::from(width) || py >= i64::from(height) {
                continue;
            }
            let idx = ((py as usize) * (width as usize) + (px as usize)) * 4;
            data[idx..idx + 4].copy_from_slice(&rgba);
        }
    }
}
