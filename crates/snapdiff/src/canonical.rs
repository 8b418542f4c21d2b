use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::Snapshot;

/// Bytes per canonical pixel (R, G, B, A).
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("image data could not be decoded: {0}")]
    Decode(String),

    #[error("image is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlphaMode {
    /// Color components scaled by alpha; fully transparent pixels compare equal.
    #[default]
    Premultiplied,
    Straight,
}

/// The fixed pixel layout every comparison draws into: sRGB, 8 bits per
/// component, RGBA order with alpha last, top-left origin.
///
/// Built once and shared by reference; never mutated after construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CanonicalFormat {
    pub alpha: AlphaMode,
}

impl CanonicalFormat {
    pub const SRGB8_PREMULTIPLIED: Self = Self {
        alpha: AlphaMode::Premultiplied,
    };

    pub fn bytes_per_row(&self, width: u32) -> usize {
        width as usize * BYTES_PER_PIXEL
    }
}

/// A decoded pixel array in [`CanonicalFormat`].
///
/// Invariant: `bytes.len() == width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBuffer {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl CanonicalBuffer {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn pixels(&self) -> impl ExactSizeIterator<Item = [u8; 4]> + '_ {
        self.bytes
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }
}

/// Draw `snapshot` into a fresh buffer in `format`.
///
/// Any source layout (grey, RGB, 16-bit, float) is normalized to 8-bit sRGB
/// RGBA first so byte comparisons are meaningful across encodings.
pub fn extract(
    snapshot: &Snapshot,
    format: &CanonicalFormat,
) -> Result<CanonicalBuffer, ExtractError> {
    let raster = snapshot.raster()?;
    let (width, height) = (raster.width(), raster.height());
    if width == 0 || height == 0 {
        return Err(ExtractError::Empty { width, height });
    }

    let mut bytes = raster.to_rgba8().into_raw();
    if format.alpha == AlphaMode::Premultiplied {
        for px in bytes.chunks_exact_mut(BYTES_PER_PIXEL) {
            let a = px[3] as u16;
            if a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }
    }

    debug_assert_eq!(bytes.len(), format.bytes_per_row(width) * height as usize);
    Ok(CanonicalBuffer {
        width,
        height,
        bytes,
    })
}

/// Exact byte equality. Buffers with different dimensions are never equal;
/// callers report a dimension mismatch before getting here.
pub fn equal_bytes(a: &CanonicalBuffer, b: &CanonicalBuffer) -> bool {
    a.dimensions() == b.dimensions() && a.bytes == b.bytes
}
