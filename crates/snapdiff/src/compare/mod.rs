pub mod perceptual;
pub mod precision;
pub mod reason;
pub mod render;
pub mod tolerance;

use std::sync::LazyLock;

use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::canonical::{CanonicalBuffer, CanonicalFormat, ExtractError, equal_bytes, extract};
use crate::codec::{ImageCodec, PngCodec};
use crate::snapshot::Snapshot;

use self::perceptual::{LabDeltaE, PerceptualMetric, PerceptualResult, perceptual_compare};
use self::precision::Precision;
use self::reason::Reason;
use self::render::render;
use self::tolerance::tolerance_compare;

/// Size of the default stand-in drawn when the candidate has no pixels.
pub const PLACEHOLDER_SIZE: (u32, u32) = (400, 80);

/// Outcome of one comparison.
#[derive(Debug)]
pub enum Verdict {
    Match,
    Mismatch(Mismatch),
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            Self::Match => None,
            Self::Mismatch(m) => Some(m),
        }
    }
}

#[derive(Debug)]
pub struct Mismatch {
    pub reason: Reason,
    /// Difference visualization; `None` when no pixels could be loaded.
    pub diff: Option<Snapshot>,
    /// Set when the candidate was empty and the placeholder stood in for it.
    pub placeholder: Option<Snapshot>,
}

/// One named image in a failure report.
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub name: &'static str,
    pub image: &'a Snapshot,
}

impl Mismatch {
    pub fn message(&self) -> String {
        self.reason.to_string()
    }

    /// The `reference` / `failure` / `difference` set for a failure report.
    /// Empty when the inputs could not be loaded at all.
    pub fn artifacts<'a>(
        &'a self,
        reference: &'a Snapshot,
        candidate: &'a Snapshot,
    ) -> Vec<Artifact<'a>> {
        let Some(diff) = &self.diff else {
            return Vec::new();
        };
        vec![
            Artifact {
                name: "reference",
                image: reference,
            },
            Artifact {
                name: "failure",
                image: self.placeholder.as_ref().unwrap_or(candidate),
            },
            Artifact {
                name: "difference",
                image: diff,
            },
        ]
    }
}

/// Everything a comparison needs besides its two images.
///
/// Immutable once built; share it by reference (or `Arc`) across threads.
pub struct Comparator {
    format: CanonicalFormat,
    codec: Box<dyn ImageCodec>,
    metric: Option<Box<dyn PerceptualMetric>>,
    placeholder: Snapshot,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            format: CanonicalFormat::SRGB8_PREMULTIPLIED,
            codec: Box::new(PngCodec),
            metric: Some(Box::new(LabDeltaE::default())),
            placeholder: default_placeholder(),
        }
    }
}

fn default_placeholder() -> Snapshot {
    let (w, h) = PLACEHOLDER_SIZE;
    Snapshot::from(RgbaImage::from_pixel(w, h, Rgba([224, 224, 224, 255])))
}

impl Comparator {
    pub fn with_format(mut self, format: CanonicalFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_codec(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Install a perceptual metric, or `None` where none is available.
    pub fn with_metric(mut self, metric: Option<Box<dyn PerceptualMetric>>) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_placeholder(mut self, placeholder: Snapshot) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn format(&self) -> &CanonicalFormat {
        &self.format
    }

    pub fn has_metric(&self) -> bool {
        self.metric.is_some()
    }

    pub fn compare(
        &self,
        reference: &Snapshot,
        candidate: &Snapshot,
        precision: Precision,
    ) -> Verdict {
        match self.evaluate(reference, candidate, precision) {
            Ok(()) => Verdict::Match,
            Err(reason) => Verdict::Mismatch(self.mismatch(reason, reference, candidate)),
        }
    }

    /// The decision tree. `Ok` means match.
    fn evaluate(
        &self,
        reference: &Snapshot,
        candidate: &Snapshot,
        precision: Precision,
    ) -> Result<(), Reason> {
        let (rw, rh) = reference
            .dimensions()
            .map_err(|e| Reason::ReferenceUnloadable(e.to_string()))?;
        let (cw, ch) = candidate
            .dimensions()
            .map_err(|e| Reason::CandidateUnloadable(e.to_string()))?;

        if cw == 0 || ch == 0 {
            return Err(Reason::EmptyCandidate);
        }
        if rw == 0 || rh == 0 {
            return Err(Reason::EmptyReference);
        }
        if (rw, rh) != (cw, ch) {
            return Err(Reason::DimensionMismatch {
                reference_w: rw,
                reference_h: rh,
                candidate_w: cw,
                candidate_h: ch,
            });
        }

        let old = extract(reference, &self.format).map_err(|e| match e {
            ExtractError::Empty { .. } => Reason::EmptyReference,
            ExtractError::Decode(msg) => Reason::ReferenceUnloadable(msg),
        })?;
        let new = extract(candidate, &self.format).map_err(|e| match e {
            ExtractError::Empty { .. } => Reason::EmptyCandidate,
            ExtractError::Decode(msg) => Reason::CandidateUnloadable(msg),
        })?;

        if equal_bytes(&old, &new) {
            debug!(width = rw, height = rh, "byte-identical");
            return Ok(());
        }

        // Compare what the candidate will look like once stored.
        let new = match self.round_trip(candidate) {
            Some(stored) if equal_bytes(&old, &stored) => {
                debug!("byte-identical after re-encoding");
                return Ok(());
            }
            Some(stored) => stored,
            None => new,
        };

        if precision.is_exact() {
            return Err(Reason::NotEqual);
        }

        let perceptual = self.perceptual(&old, &new, &precision);
        if perceptual.is_some_and(|r| r.is_match) {
            return Ok(());
        }

        let tolerance = tolerance_compare(&old, &new, precision.pixel());
        if tolerance.is_match {
            return Ok(());
        }

        Err(match perceptual {
            Some(r) if precision.pixel() < 1.0 => Reason::PixelAndPerceptualPrecision {
                pixel_actual: tolerance.actual_precision,
                pixel_required: precision.pixel(),
                actual: r.perceptual_precision,
                required: precision.perceptual(),
            },
            Some(r) => Reason::PerceptualPrecision {
                actual: r.perceptual_precision,
                required: precision.perceptual(),
            },
            None => Reason::PixelPrecision {
                actual: tolerance.actual_precision,
                required: precision.pixel(),
            },
        })
    }

    /// Encode and decode the candidate through the codec. `None` if either
    /// step fails; the original buffer is used instead.
    fn round_trip(&self, candidate: &Snapshot) -> Option<CanonicalBuffer> {
        let stored = self
            .codec
            .encode(candidate)
            .and_then(|bytes| self.codec.decode(&bytes, candidate.scale()));
        match stored {
            Ok(snapshot) => extract(&snapshot, &self.format).ok(),
            Err(e) => {
                debug!(error = %e, "skipping re-encoded comparison");
                None
            }
        }
    }

    /// Runs only when perceptual tolerance is requested and a metric exists.
    fn perceptual(
        &self,
        old: &CanonicalBuffer,
        new: &CanonicalBuffer,
        precision: &Precision,
    ) -> Option<PerceptualResult> {
        if precision.perceptual() >= 1.0 {
            return None;
        }
        let metric = self.metric.as_deref()?;
        match perceptual_compare(metric, old, new, precision) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(metric = metric.name(), error = %e, "falling back to byte tolerance");
                None
            }
        }
    }

    fn mismatch(&self, reason: Reason, reference: &Snapshot, candidate: &Snapshot) -> Mismatch {
        debug!(reason = %reason, "mismatch");
        if reason.is_unloadable() {
            return Mismatch {
                reason,
                diff: None,
                placeholder: None,
            };
        }

        let placeholder = (reason == Reason::EmptyCandidate).then(|| self.placeholder.clone());
        let shown = placeholder.as_ref().unwrap_or(candidate);
        let diff = match render(reference, shown) {
            Ok(diff) => Some(diff),
            Err(e) => {
                warn!(error = %e, "failed to render difference image");
                None
            }
        };
        Mismatch {
            reason,
            diff,
            placeholder,
        }
    }
}

static DEFAULT_COMPARATOR: LazyLock<Comparator> = LazyLock::new(Comparator::default);

/// Compare with the default comparator: premultiplied sRGB8, PNG round trip,
/// CIE94 perceptual metric.
pub fn compare(reference: &Snapshot, candidate: &Snapshot, precision: Precision) -> Verdict {
    DEFAULT_COMPARATOR.compare(reference, candidate, precision)
}
