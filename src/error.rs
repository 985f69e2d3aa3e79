pub type PhotostripResult<T> = Result<T, PhotostripError>;

#[derive(thiserror::Error, Debug)]
pub enum PhotostripError {
    /// Unknown layout identifier. Fatal; raised before any canvas work.
    #[error("unsupported layout '{0}'")]
    UnsupportedLayout(String),

    /// Wrong number of source photos for the resolved template. Fatal;
    /// raised before any drawing begins.
    #[error("layout '{layout}' requires exactly {expected} source photos, got {actual}")]
    SourceCountMismatch {
        layout: String,
        expected: usize,
        actual: usize,
    },

    /// A required source photo failed to decode. Fatal for the whole render.
    #[error("source photo for slot {slot} failed to decode: {reason}")]
    SourceDecode { slot: usize, reason: String },

    /// A background asset failed to load or decode. Absorbed by the
    /// background renderer (fallback fill); never returned by `render`.
    #[error("background asset '{asset}' unavailable: {reason}")]
    BackgroundAsset { asset: String, reason: String },

    /// The decorative overlay failed to rasterize. Absorbed by the overlay
    /// pass (stamp skipped); never returned by `render`.
    #[error("overlay error: {0}")]
    Overlay(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PhotostripError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn overlay(msg: impl Into<String>) -> Self {
        Self::Overlay(msg.into())
    }

    pub fn source_decode(slot: usize, reason: impl Into<String>) -> Self {
        Self::SourceDecode {
            slot,
            reason: reason.into(),
        }
    }

    pub fn background_asset(asset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BackgroundAsset {
            asset: asset.into(),
            reason: reason.into(),
        }
    }

    /// `true` when the render as a whole must abort.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BackgroundAsset { .. } | Self::Overlay(_))
    }
}
