use std::path::PathBuf;

use anyhow::{Context, Result};
use snapdiff::{
    AlphaMode, CanonicalFormat, Comparator, DeltaEFormula, ImageCodec, LabDeltaE,
    PerceptualMetric, PngCodec, Precision,
};
use tracing::debug;

use super::{Config, load};

/// Values from the CLI that participate in the merge.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct CliOverrides {
    /// Fraction of bytes that must match (0.0–1.0)
    #[arg(long, value_parser = crate::cli::parse_precision)]
    pub precision: Option<f64>,

    /// Per-pixel perceptual closeness required (0.0–1.0)
    #[arg(long, value_parser = crate::cli::parse_precision)]
    pub perceptual_precision: Option<f64>,

    /// Skip the perceptual metric; compare with byte tolerance only
    #[arg(long)]
    pub no_perceptual: bool,
}

/// Values read from `SNAPDIFF_*` environment variables.
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub precision: Option<f64>,
    pub perceptual_precision: Option<f64>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            precision: env_f64("SNAPDIFF_PRECISION")?,
            perceptual_precision: env_f64("SNAPDIFF_PERCEPTUAL_PRECISION")?,
        })
    }
}

fn env_f64(name: &str) -> Result<Option<f64>> {
    std::env::var(name)
        .ok()
        .map(|v| v.parse::<f64>())
        .transpose()
        .with_context(|| format!("{name} must be a valid float"))
}

/// Fully resolved config after CLI > env > file > defaults merge.
#[derive(Debug)]
pub struct ResolvedRunConfig {
    pub precision: Precision,
    pub formula: DeltaEFormula,
    pub perceptual: bool,
    pub alpha: AlphaMode,
    pub placeholder: Option<PathBuf>,
}

impl ResolvedRunConfig {
    pub fn new(cli: CliOverrides) -> Result<Self> {
        let file_config = load()?;
        let env = EnvOverrides::from_env()?;
        Self::resolve(file_config, env, cli)
    }

    pub fn resolve(file: Config, env: EnvOverrides, cli: CliOverrides) -> Result<Self> {
        let pixel = cli
            .precision
            .or(env.precision)
            .unwrap_or(file.diff.precision);
        let perceptual = cli
            .perceptual_precision
            .or(env.perceptual_precision)
            .unwrap_or(file.diff.perceptual_precision);
        let precision = Precision::new(pixel, perceptual)?;

        Ok(Self {
            precision,
            formula: file.diff.formula,
            perceptual: file.diff.perceptual && !cli.no_perceptual,
            alpha: file.diff.alpha,
            placeholder: file.diff.placeholder,
        })
    }

    /// Build the comparator this configuration describes.
    pub fn comparator(&self) -> Result<Comparator> {
        let metric: Option<Box<dyn PerceptualMetric>> = self
            .perceptual
            .then(|| Box::new(LabDeltaE::new(self.formula)) as _);
        debug!(
            precision = self.precision.pixel(),
            perceptual_precision = self.precision.perceptual(),
            metric = ?metric.as_ref().map(|m| m.name()),
            "comparator configured"
        );

        let mut comparator = Comparator::default()
            .with_format(CanonicalFormat { alpha: self.alpha })
            .with_metric(metric);
        if let Some(path) = &self.placeholder {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read placeholder {}", path.display()))?;
            let placeholder = PngCodec
                .decode(&bytes, 1.0)
                .with_context(|| format!("Failed to decode placeholder {}", path.display()))?;
            comparator = comparator.with_placeholder(placeholder);
        }
        Ok(comparator)
    }
}
