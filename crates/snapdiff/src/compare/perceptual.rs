use palette::color_difference::Ciede2000;
use palette::convert::FromColorUnclamped;
use palette::{Lab, Srgb};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::canonical::CanonicalBuffer;

use super::precision::Precision;

/// Delta-E at which two colors count as entirely different.
const MAX_DELTA_E: f64 = 100.0;

/// CIE94 graphic-arts weighting constants.
const CIE94_K1: f32 = 0.045;
const CIE94_K2: f32 = 0.015;

/// The perceptual metric could not produce a result. Not a mismatch: the
/// comparator falls back to byte tolerance.
#[derive(Debug, Error)]
#[error("perceptual metric unavailable: {0}")]
pub struct MetricUnavailable(pub String);

/// Per-pixel Delta-E values, row-major.
#[derive(Debug, Clone)]
pub struct DeltaEMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DeltaEMap {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, MetricUnavailable> {
        if values.len() != width as usize * height as usize {
            return Err(MetricUnavailable(format!(
                "expected {} values for {width}x{height}, got {}",
                width as usize * height as usize,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Worst pixel. NaN values count as maximally different.
    pub fn max(&self) -> f32 {
        self.values
            .iter()
            .map(|&d| if d.is_nan() { MAX_DELTA_E as f32 } else { d })
            .fold(0.0, f32::max)
    }

    /// Fraction of pixels whose own perceptual precision meets `required`.
    pub fn fraction_within(&self, required: f64) -> f64 {
        if self.values.is_empty() {
            return 1.0;
        }
        let within = self
            .values
            .iter()
            .filter(|&&d| perceptual_precision(d) >= required)
            .count();
        within as f64 / self.values.len() as f64
    }
}

/// Map a Delta-E value onto the 0..1 precision scale. Distances beyond 100
/// (possible with CIE94 on saturated colors) clamp to 0.
pub fn perceptual_precision(delta_e: f32) -> f64 {
    (1.0 - delta_e as f64 / MAX_DELTA_E).clamp(0.0, 1.0)
}

/// An execution context that can compute a per-pixel color-difference map.
///
/// Implementations may be backed by shared device resources; they must be
/// safe to call from several threads at once.
pub trait PerceptualMetric: Send + Sync {
    fn name(&self) -> &str;
    fn delta_e(
        &self,
        old: &CanonicalBuffer,
        new: &CanonicalBuffer,
    ) -> Result<DeltaEMap, MetricUnavailable>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaEFormula {
    #[default]
    Cie94,
    Ciede2000,
}

/// CPU Delta-E in CIE L*a*b* (D65).
///
/// Color is compared in Lab; a coverage change counts as `|Δα| / 255 * 100`
/// and the larger of the two is the pixel's distance. Without the alpha
/// term, a transparent pixel and an opaque black one would compare equal in
/// premultiplied buffers.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabDeltaE {
    pub formula: DeltaEFormula,
}

impl LabDeltaE {
    pub fn new(formula: DeltaEFormula) -> Self {
        Self { formula }
    }
}

impl PerceptualMetric for LabDeltaE {
    fn name(&self) -> &str {
        match self.formula {
            DeltaEFormula::Cie94 => "lab-cie94",
            DeltaEFormula::Ciede2000 => "lab-ciede2000",
        }
    }

    fn delta_e(
        &self,
        old: &CanonicalBuffer,
        new: &CanonicalBuffer,
    ) -> Result<DeltaEMap, MetricUnavailable> {
        if old.dimensions() != new.dimensions() {
            return Err(MetricUnavailable(format!(
                "buffers differ in size: {}x{} vs {}x{}",
                old.width(),
                old.height(),
                new.width(),
                new.height()
            )));
        }

        let values = old
            .pixels()
            .zip(new.pixels())
            .map(|(a, b)| {
                if a == b {
                    return 0.0;
                }
                let coverage = alpha_distance(a[3], b[3]);
                if a[..3] == b[..3] {
                    return coverage;
                }
                let (la, lb) = (to_lab(a), to_lab(b));
                let color = match self.formula {
                    DeltaEFormula::Cie94 => cie94(la, lb),
                    DeltaEFormula::Ciede2000 => la.difference(lb),
                };
                color.max(coverage)
            })
            .collect();
        DeltaEMap::new(old.width(), old.height(), values)
    }
}

fn alpha_distance(a: u8, b: u8) -> f32 {
    a.abs_diff(b) as f32 / 255.0 * MAX_DELTA_E as f32
}

fn to_lab(px: [u8; 4]) -> Lab {
    let srgb = Srgb::new(
        px[0] as f32 / 255.0,
        px[1] as f32 / 255.0,
        px[2] as f32 / 255.0,
    );
    Lab::from_color_unclamped(srgb)
}

fn cie94(reference: Lab, sample: Lab) -> f32 {
    let dl = reference.l - sample.l;
    let c1 = reference.a.hypot(reference.b);
    let c2 = sample.a.hypot(sample.b);
    let dc = c1 - c2;
    let da = reference.a - sample.a;
    let db = reference.b - sample.b;
    // Rounding can push this slightly negative for near-neutral colors.
    let dh2 = (da * da + db * db - dc * dc).max(0.0);

    let sc = 1.0 + CIE94_K1 * c1;
    let sh = 1.0 + CIE94_K2 * c1;
    (dl * dl + (dc / sc).powi(2) + dh2 / (sh * sh)).sqrt()
}

/// Result of the perceptual comparison path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceptualResult {
    pub is_match: bool,
    pub max_delta_e: f32,
    /// Perceptual precision of the worst pixel.
    pub perceptual_precision: f64,
    /// Fraction of pixels individually within the perceptual requirement.
    /// Diagnostic only; the verdict and messages use byte tolerance for the
    /// pixel figure.
    pub pixel_precision: f64,
}

/// Worst-pixel perceptual comparison: a single pixel beyond the allowed
/// Delta-E fails the whole image.
pub fn perceptual_compare(
    metric: &dyn PerceptualMetric,
    old: &CanonicalBuffer,
    new: &CanonicalBuffer,
    precision: &Precision,
) -> Result<PerceptualResult, MetricUnavailable> {
    let map = metric.delta_e(old, new)?;
    if map.dimensions() != old.dimensions() {
        return Err(MetricUnavailable(format!(
            "{} returned a {}x{} map for {}x{} input",
            metric.name(),
            map.width,
            map.height,
            old.width(),
            old.height()
        )));
    }

    let max_delta_e = map.max();
    let actual = perceptual_precision(max_delta_e);
    let result = PerceptualResult {
        is_match: actual >= precision.perceptual(),
        max_delta_e,
        perceptual_precision: actual,
        pixel_precision: map.fraction_within(precision.perceptual()),
    };
    debug!(
        metric = metric.name(),
        max_delta_e,
        actual,
        required = precision.perceptual(),
        pixels_within = result.pixel_precision,
        is_match = result.is_match,
        "perceptual comparison"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{CanonicalFormat, extract};
    use crate::snapshot::Snapshot;
    use image::{Rgba, RgbaImage};

    fn buffer(img: RgbaImage) -> CanonicalBuffer {
        extract(&Snapshot::from(img), &CanonicalFormat::SRGB8_PREMULTIPLIED).unwrap()
    }

    /// Returns a fixed map regardless of input.
    struct FixedMetric(Vec<f32>);

    impl PerceptualMetric for FixedMetric {
        fn name(&self) -> &str {
            "fixed"
        }

        fn delta_e(
            &self,
            old: &CanonicalBuffer,
            _new: &CanonicalBuffer,
        ) -> Result<DeltaEMap, MetricUnavailable> {
            DeltaEMap::new(old.width(), old.height(), self.0.clone())
        }
    }

    #[test]
    fn identical_colors_have_zero_distance() {
        let a = buffer(RgbaImage::from_pixel(4, 4, Rgba([30, 120, 200, 255])));
        for formula in [DeltaEFormula::Cie94, DeltaEFormula::Ciede2000] {
            let map = LabDeltaE::new(formula).delta_e(&a, &a).unwrap();
            assert_eq!(map.max(), 0.0);
        }
    }

    #[test]
    fn black_vs_white_is_about_one_hundred() {
        let black = buffer(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])));
        let white = buffer(RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255])));
        let d = LabDeltaE::default().delta_e(&black, &white).unwrap().max();
        assert!((d - 100.0).abs() < 0.5, "got {d}");
    }

    #[test]
    fn small_nudge_is_small_distance() {
        let a = buffer(RgbaImage::from_pixel(2, 2, Rgba([128, 128, 128, 255])));
        let b = buffer(RgbaImage::from_pixel(2, 2, Rgba([129, 128, 128, 255])));
        let d = LabDeltaE::default().delta_e(&a, &b).unwrap().max();
        assert!(d > 0.0 && d < 1.0, "got {d}");
    }

    #[test]
    fn size_mismatch_is_unavailable() {
        let a = buffer(RgbaImage::new(2, 2));
        let b = buffer(RgbaImage::new(2, 3));
        assert!(LabDeltaE::default().delta_e(&a, &b).is_err());
    }

    #[test]
    fn max_delta_e_twenty_is_precision_point_eight() {
        let a = buffer(RgbaImage::new(2, 1));
        let metric = FixedMetric(vec![5.0, 20.0]);

        let at = perceptual_compare(&metric, &a, &a, &Precision::new(1.0, 0.8).unwrap()).unwrap();
        assert_eq!(at.max_delta_e, 20.0);
        assert_eq!(at.perceptual_precision, 0.8);
        assert!(at.is_match);

        let above =
            perceptual_compare(&metric, &a, &a, &Precision::new(1.0, 0.81).unwrap()).unwrap();
        assert!(!above.is_match);
    }

    #[test]
    fn one_bad_pixel_fails_whole_image() {
        let a = buffer(RgbaImage::new(4, 1));
        let metric = FixedMetric(vec![0.0, 0.0, 0.0, 60.0]);
        let r = perceptual_compare(&metric, &a, &a, &Precision::new(0.5, 0.9).unwrap()).unwrap();
        assert!(!r.is_match);
        assert_eq!(r.pixel_precision, 0.75);
    }

    #[test]
    fn wrong_sized_map_is_unavailable() {
        let a = buffer(RgbaImage::new(3, 1));
        let metric = FixedMetric(vec![0.0]);
        assert!(perceptual_compare(&metric, &a, &a, &Precision::new(1.0, 0.5).unwrap()).is_err());
    }

    #[test]
    fn alpha_change_counts_as_distance() {
        let transparent = buffer(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])));
        let black = buffer(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        for formula in [DeltaEFormula::Cie94, DeltaEFormula::Ciede2000] {
            let map = LabDeltaE::new(formula).delta_e(&transparent, &black).unwrap();
            assert_eq!(map.max(), 100.0);
        }

        let half = buffer(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 51])));
        let clear = buffer(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        let d = LabDeltaE::default().delta_e(&half, &clear).unwrap().max();
        assert!((d - 20.0).abs() < 1e-4, "got {d}");
    }

    #[test]
    fn precision_is_clamped_for_large_distances() {
        assert_eq!(perceptual_precision(120.0), 0.0);
        assert_eq!(perceptual_precision(0.0), 1.0);

        let a = buffer(RgbaImage::new(1, 1));
        let r = perceptual_compare(
            &FixedMetric(vec![130.0]),
            &a,
            &a,
            &Precision::new(1.0, 0.5).unwrap(),
        )
        .unwrap();
        assert_eq!(r.perceptual_precision, 0.0);
        assert!(!r.is_match);
    }

    #[test]
    fn nan_counts_as_worst() {
        let map = DeltaEMap::new(2, 1, vec![1.0, f32::NAN]).unwrap();
        assert_eq!(map.max(), 100.0);
    }
}
