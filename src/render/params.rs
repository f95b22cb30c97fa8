use crate::assets::avatar::PreparedAvatar;
use crate::assets::color::Color;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{PodwaveError, PodwaveResult};

/// Immutable configuration for one waveform render job.
///
/// Shared read-only across all pool workers; nothing here changes once the
/// job starts.
#[derive(Clone, Debug)]
pub struct RenderParams {
    canvas: Canvas,
    fps: Fps,
    wave_color: Color,
    background_color: Color,
    avatar: Option<PreparedAvatar>,
}

impl RenderParams {
    /// Create validated render parameters.
    ///
    /// Dimensions must be non-zero and even (yuv420p MP4 output requirement).
    pub fn new(
        canvas: Canvas,
        fps: Fps,
        wave_color: Color,
        background_color: Color,
    ) -> PodwaveResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(PodwaveError::validation(
                "render canvas width/height must be non-zero",
            ));
        }
        if !canvas.width.is_multiple_of(2) || !canvas.height.is_multiple_of(2) {
            return Err(PodwaveError::validation(
                "render canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(Self {
            canvas,
            fps,
            wave_color,
            background_color,
            avatar: None,
        })
    }

    /// Attach a prepared avatar overlay.
    pub fn with_avatar(mut self, avatar: PreparedAvatar) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Waveform stroke color.
    pub fn wave_color(&self) -> Color {
        self.wave_color
    }

    /// Background fill color.
    pub fn background_color(&self) -> Color {
        self.background_color
    }

    /// Optional avatar overlay.
    pub fn avatar(&self) -> Option<&PreparedAvatar> {
        self.avatar.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_odd_dimensions() {
        let fps = Fps::new(30, 1).unwrap();
        let wave = Color::rgb(0, 255, 0);
        let bg = Color::rgb(0, 0, 0);

        assert!(
            RenderParams::new(
                Canvas {
                    width: 0,
                    height: 720
                },
                fps,
                wave,
                bg
            )
            .is_err()
        );
        assert!(
            RenderParams::new(
                Canvas {
                    width: 641,
                    height: 360
                },
                fps,
                wave,
                bg
            )
            .is_err()
        );
        assert!(
            RenderParams::new(
                Canvas {
                    width: 640,
                    height: 360
                },
                fps,
                wave,
                bg
            )
            .is_ok()
        );
    }
}
