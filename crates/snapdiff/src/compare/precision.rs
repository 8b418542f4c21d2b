use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("{name} must be between 0.0 and 1.0, got {value}")]
pub struct PrecisionError {
    pub name: &'static str,
    pub value: f64,
}

pub fn validate_precision(name: &'static str, value: f64) -> Result<f64, PrecisionError> {
    // Written so that NaN is rejected too.
    if !(0.0..=1.0).contains(&value) {
        return Err(PrecisionError { name, value });
    }
    Ok(value)
}

/// How close a candidate has to be to its reference.
///
/// `pixel` is the minimum fraction of matching bytes. `perceptual` is the
/// minimum per-pixel closeness, where 1 means visually identical everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Precision {
    pixel: f64,
    perceptual: f64,
}

impl Precision {
    pub const EXACT: Self = Self {
        pixel: 1.0,
        perceptual: 1.0,
    };

    pub fn new(pixel: f64, perceptual: f64) -> Result<Self, PrecisionError> {
        Ok(Self {
            pixel: validate_precision("precision", pixel)?,
            perceptual: validate_precision("perceptual precision", perceptual)?,
        })
    }

    pub fn pixel(&self) -> f64 {
        self.pixel
    }

    pub fn perceptual(&self) -> f64 {
        self.perceptual
    }

    pub fn is_exact(&self) -> bool {
        self.pixel == 1.0 && self.perceptual == 1.0
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::EXACT
    }
}
