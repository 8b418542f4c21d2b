use tracing::debug;

use crate::canonical::CanonicalBuffer;

/// Absorbs float error in `precision * total` so that e.g. 0.9 of 20 bytes
/// requires exactly 18 matching bytes.
const ROUNDING_SLACK: f64 = 1e-9;

pub struct ToleranceResult {
    pub is_match: bool,
    pub differing_bytes: u64,
    pub total_bytes: u64,
    /// `1 - differing / total`.
    pub actual_precision: f64,
}

/// Byte-level fallback: count differing components (R, G, B and A count
/// individually) and allow up to `floor((1 - pixel_precision) * total)`.
///
/// The allowance is computed in whole bytes as `total - ceil(precision * total)`.
pub fn tolerance_compare(
    a: &CanonicalBuffer,
    b: &CanonicalBuffer,
    pixel_precision: f64,
) -> ToleranceResult {
    debug_assert_eq!(a.dimensions(), b.dimensions());

    let total_bytes = a.byte_len() as u64;
    let threshold = total_bytes - required_matching(pixel_precision, total_bytes);
    let differing_bytes = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .filter(|(x, y)| x != y)
        .count() as u64;

    let actual_precision = if total_bytes > 0 {
        1.0 - differing_bytes as f64 / total_bytes as f64
    } else {
        1.0
    };

    debug!(
        differing_bytes,
        total_bytes, threshold, actual_precision, "byte tolerance comparison"
    );
    ToleranceResult {
        is_match: differing_bytes <= threshold,
        differing_bytes,
        total_bytes,
        actual_precision,
    }
}

/// Number of bytes that must be identical for `precision` of `total`.
fn required_matching(precision: f64, total: u64) -> u64 {
    let exact = precision * total as f64;
    ((exact - ROUNDING_SLACK).ceil().max(0.0) as u64).min(total)
}
