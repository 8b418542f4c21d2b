use std::io::Cursor;
use std::sync::OnceLock;

use image::{DynamicImage, ImageReader, RgbaImage};

use crate::canonical::ExtractError;

/// An immutable raster handle: pixel content plus a logical-to-physical scale.
///
/// A snapshot is either backed by decoded pixels or by encoded bytes that are
/// only decoded when pixel data is actually needed. The latter mirrors images
/// loaded from disk whose backing store may turn out to be corrupt. A
/// successful decode is kept, so each snapshot is decoded at most once.
#[derive(Debug, Clone)]
pub struct Snapshot {
    backing: Backing,
    scale: f32,
}

#[derive(Debug, Clone)]
enum Backing {
    Pixels(DynamicImage),
    Encoded {
        bytes: Vec<u8>,
        decoded: OnceLock<DynamicImage>,
    },
}

impl Snapshot {
    pub fn new(image: impl Into<DynamicImage>, scale: f32) -> Self {
        Self {
            backing: Backing::Pixels(image.into()),
            scale,
        }
    }

    /// Wrap encoded bytes without decoding them.
    pub fn from_encoded(bytes: Vec<u8>, scale: f32) -> Self {
        Self {
            backing: Backing::Encoded {
                bytes,
                decoded: OnceLock::new(),
            },
            scale,
        }
    }

    /// A zero-area snapshot (what a view with no size renders to).
    pub fn empty(scale: f32) -> Self {
        Self::new(RgbaImage::new(0, 0), scale)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Pixel dimensions. Reads only the header for encoded snapshots that
    /// have not been decoded yet.
    pub fn dimensions(&self) -> Result<(u32, u32), ExtractError> {
        let bytes = match &self.backing {
            Backing::Pixels(img) => return Ok((img.width(), img.height())),
            Backing::Encoded { bytes, decoded } => match decoded.get() {
                Some(img) => return Ok((img.width(), img.height())),
                None => bytes,
            },
        };
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ExtractError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| ExtractError::Decode(e.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool, ExtractError> {
        let (w, h) = self.dimensions()?;
        Ok(w == 0 || h == 0)
    }

    /// Obtain the decoded raster, decoding on first use. Decode failures are
    /// not cached.
    pub fn raster(&self) -> Result<&DynamicImage, ExtractError> {
        match &self.backing {
            Backing::Pixels(img) => Ok(img),
            Backing::Encoded { bytes, decoded } => {
                if let Some(img) = decoded.get() {
                    return Ok(img);
                }
                let img = image::load_from_memory(bytes)
                    .map_err(|e| ExtractError::Decode(e.to_string()))?;
                Ok(decoded.get_or_init(|| img))
            }
        }
    }

    /// Whether pixel data is available without decoding.
    pub fn is_decoded(&self) -> bool {
        match &self.backing {
            Backing::Pixels(_) => true,
            Backing::Encoded { decoded, .. } => decoded.get().is_some(),
        }
    }
}

impl From<RgbaImage> for Snapshot {
    fn from(img: RgbaImage) -> Self {
        Self::new(img, 1.0)
    }
}
