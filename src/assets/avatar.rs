use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Canvas;
use crate::foundation::error::{PodwaveError, PodwaveResult};

/// Decoded avatar image, straight RGB8.
///
/// Loading is fallible but never fatal to a render job: callers log the
/// failure and continue without an overlay.
#[derive(Clone, Debug)]
pub struct AvatarImage {
    rgb: image::RgbImage,
}

/// Load an avatar image from disk.
pub fn load_avatar(path: &Path) -> PodwaveResult<AvatarImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read avatar '{}'", path.display()))?;
    let dyn_img = image::load_from_memory(&bytes).context("decode avatar image")?;
    Ok(AvatarImage {
        rgb: dyn_img.to_rgb8(),
    })
}

impl AvatarImage {
    /// Resize for `canvas` and precompute the inscribed-circle mask and the
    /// centered placement offsets.
    ///
    /// The avatar is clamped to a square of one third of the smaller canvas
    /// dimension.
    pub fn prepare(&self, canvas: Canvas) -> PodwaveResult<PreparedAvatar> {
        let size = (canvas.width / 3).min(canvas.height / 3);
        if size == 0 {
            return Err(PodwaveError::validation(
                "canvas too small for avatar overlay (needs at least 3x3)",
            ));
        }

        let resized =
            image::imageops::resize(&self.rgb, size, size, image::imageops::FilterType::Triangle);

        // Inscribed circle: center (size/2, size/2), radius size/2. Pixels at
        // distance > radius keep the underlying frame content.
        let center = i64::from(size / 2);
        let radius_sq = center * center;
        let mut mask = vec![false; (size as usize) * (size as usize)];
        for y in 0..size {
            for x in 0..size {
                let dx = i64::from(x) - center;
                let dy = i64::from(y) - center;
                mask[(y as usize) * (size as usize) + (x as usize)] =
                    dx * dx + dy * dy <= radius_sq;
            }
        }

        Ok(PreparedAvatar {
            size,
            x_offset: (canvas.width - size) / 2,
            y_offset: (canvas.height - size) / 2,
            rgb8: resized.into_raw(),
            mask,
        })
    }
}

/// Avatar resized for one canvas, with circular mask and placement baked in.
///
/// Immutable for the lifetime of a render job; shared read-only across
/// workers.
#[derive(Clone, Debug)]
pub struct PreparedAvatar {
    size: u32,
    x_offset: u32,
    y_offset: u32,
    rgb8: Vec<u8>,
    mask: Vec<bool>,
}

impl PreparedAvatar {
    /// Edge length of the square overlay region in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Composite the masked avatar onto an opaque RGBA8 frame buffer.
    ///
    /// Pixels outside the inscribed circle are left untouched.
    pub(crate) fn composite_onto(&self, frame: &mut [u8], frame_width: u32) {
        let size = self.size as usize;
        for ay in 0..size {
            let fy = self.y_offset as usize + ay;
            for ax in 0..size {
                if !self.mask[ay * size + ax] {
                    continue;
                }
                let fx = self.x_offset as usize + ax;
                let dst = (fy * frame_width as usize + fx) * 4;
                let src = (ay * size + ax) * 3;
                frame[dst] = self.rgb8[src];
                frame[dst + 1] = self.rgb8[src + 1];
                frame[dst + 2] = self.rgb8[src + 2];
                frame[dst + 3] = 255;
            }
        }
    }
}
