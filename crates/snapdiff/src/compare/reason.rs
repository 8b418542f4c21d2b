use thiserror::Error;

/// Why a comparison failed. The `Display` output is the diagnostic message
/// handed to whoever reports the failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Reason {
    #[error("Reference is not a loadable image ({0})")]
    ReferenceUnloadable(String),

    #[error("Newly-taken snapshot is not a loadable image ({0})")]
    CandidateUnloadable(String),

    #[error("Reference is empty.")]
    EmptyReference,

    #[error("Newly-taken snapshot is empty.")]
    EmptyCandidate,

    #[error(
        "Newly-taken snapshot@{candidate_w}x{candidate_h} does not match reference@{reference_w}x{reference_h}."
    )]
    DimensionMismatch {
        reference_w: u32,
        reference_h: u32,
        candidate_w: u32,
        candidate_h: u32,
    },

    #[error("Newly-taken snapshot does not match reference.")]
    NotEqual,

    #[error("Actual image precision {actual} is less than required {required}")]
    PixelPrecision { actual: f64, required: f64 },

    #[error("Actual perceptual precision {actual} is less than required {required}")]
    PerceptualPrecision { actual: f64, required: f64 },

    #[error(
        "Actual image precision {pixel_actual} is less than required {pixel_required}\n\
         Actual perceptual precision {actual} is less than required {required}"
    )]
    PixelAndPerceptualPrecision {
        pixel_actual: f64,
        pixel_required: f64,
        actual: f64,
        required: f64,
    },
}

impl Reason {
    /// Failures where no pixel data was available to render a diff from.
    pub fn is_unloadable(&self) -> bool {
        matches!(
            self,
            Self::ReferenceUnloadable(_) | Self::CandidateUnloadable(_)
        )
    }
}
