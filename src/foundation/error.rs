/// Convenience result alias used across the crate.
pub type AudiogramResult<T> = Result<T, AudiogramError>;

/// Errors produced while validating, rendering or exporting an audiogram.
#[derive(Debug, thiserror::Error)]
pub enum AudiogramError {
    /// Malformed configuration, captions or geometry.
    #[error("validation error: {0}")]
    Validation(String),

    /// Audio or image input could not be decoded. Feature-local: callers are expected to
    /// degrade (drop the asset, keep rendering) where the surrounding feature allows it.
    #[error("media load error: {0}")]
    MediaLoad(String),

    /// The encoder process could not be located or started. Fatal before any frame work.
    #[error("encoder init error: {0}")]
    EncoderInit(String),

    /// A single frame failed to rasterize or reach the encoder; the attempt aborts.
    #[error("frame encode error: {0}")]
    FrameEncode(String),

    /// Container assembly (audio re-encode + mux) failed after frames were delivered.
    #[error("mux error: {0}")]
    Mux(String),

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON document error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Any other underlying error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AudiogramError {
    /// Build a [`AudiogramError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`AudiogramError::MediaLoad`].
    pub fn media(msg: impl Into<String>) -> Self {
        Self::MediaLoad(msg.into())
    }

    /// Build a [`AudiogramError::EncoderInit`].
    pub fn encoder_init(msg: impl Into<String>) -> Self {
        Self::EncoderInit(msg.into())
    }

    /// Build a [`AudiogramError::FrameEncode`].
    pub fn frame_encode(msg: impl Into<String>) -> Self {
        Self::FrameEncode(msg.into())
    }

    /// Build a [`AudiogramError::Mux`].
    pub fn mux(msg: impl Into<String>) -> Self {
        Self::Mux(msg.into())
    }
}
