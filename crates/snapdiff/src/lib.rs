//! Visual-regression comparison: decide whether a candidate image is close
//! enough to its reference, and explain why not.
//!
//! Comparison runs in stages, cheapest first:
//! 1. structural checks (loadable, non-empty, same dimensions)
//! 2. byte equality of the canonical RGBA8 buffers, also after a codec round trip
//! 3. worst-pixel Lab Delta-E, when perceptual tolerance is requested
//! 4. byte tolerance against the required pixel precision
//!
//! Failures carry a message and a difference image.

pub mod canonical;
pub mod codec;
pub mod compare;
pub mod snapshot;

pub use self::canonical::{AlphaMode, CanonicalBuffer, CanonicalFormat, ExtractError};
pub use self::codec::{CodecError, ImageCodec, PngCodec};
pub use self::compare::perceptual::{DeltaEFormula, LabDeltaE, MetricUnavailable, PerceptualMetric};
pub use self::compare::precision::{Precision, PrecisionError, validate_precision};
pub use self::compare::reason::Reason;
pub use self::compare::render::render;
pub use self::compare::{Artifact, Comparator, Mismatch, Verdict, compare};
pub use self::snapshot::Snapshot;
