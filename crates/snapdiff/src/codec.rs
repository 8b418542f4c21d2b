use std::io::Cursor;

use image::ImageFormat;
use thiserror::Error;

use crate::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("failed to decode image: {0}")]
    Decode(String),
}

/// Persistence format for snapshots.
///
/// The comparator also round-trips the candidate through the codec so that a
/// live-rendered image compares equal to its own stored copy.
pub trait ImageCodec: Send + Sync {
    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8], scale: f32) -> Result<Snapshot, CodecError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>, CodecError> {
        let raster = snapshot
            .raster()
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        let mut buf = Vec::new();
        raster
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8], scale: f32) -> Result<Snapshot, CodecError> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(Snapshot::new(img, scale))
    }
}
