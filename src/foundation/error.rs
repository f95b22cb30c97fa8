/// Convenience result type used across Podwave.
pub type PodwaveResult<T> = Result<T, PodwaveError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum PodwaveError {
    /// Invalid user-provided input: manifest shape, colors, canvas sizes.
    #[error("validation error: {0}")]
    Validation(String),

    /// Media probe/decode collaborator failures (ffprobe, ffmpeg decode).
    #[error("media error: {0}")]
    Media(String),

    /// Encode subprocess failures (ffmpeg encode, concat, mux, metadata).
    #[error("encode error: {0}")]
    Encode(String),

    /// Frame render job failures (worker errors, ordering violations).
    #[error("render error: {0}")]
    Render(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PodwaveError {
    /// Build a [`PodwaveError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PodwaveError::Media`] value.
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Build a [`PodwaveError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`PodwaveError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
