pub mod resolve;
pub mod template;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snapdiff::{AlphaMode, DeltaEFormula, validate_precision};

pub use self::resolve::{CliOverrides, ResolvedRunConfig};
pub use self::template::{config_file_exists, write_gitignore, write_template};

pub(crate) const CONFIG_DIR: &str = ".snapdiff";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Minimum fraction of matching bytes (0.0-1.0).
    #[serde(default = "full_precision")]
    pub precision: f64,
    /// Minimum per-pixel perceptual closeness (0.0-1.0).
    #[serde(default = "full_precision")]
    pub perceptual_precision: f64,
    #[serde(default)]
    pub formula: DeltaEFormula,
    /// `false` runs without a perceptual metric (byte tolerance only).
    #[serde(default = "enabled")]
    pub perceptual: bool,
    #[serde(default)]
    pub alpha: AlphaMode,
    /// PNG shown in place of an empty candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PathBuf>,
}

fn full_precision() -> f64 {
    1.0
}

fn enabled() -> bool {
    true
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            precision: full_precision(),
            perceptual_precision: full_precision(),
            formula: DeltaEFormula::default(),
            perceptual: enabled(),
            alpha: AlphaMode::default(),
            placeholder: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub diff: DiffConfig,
}

impl Config {
    fn validate(&self) -> Result<()> {
        validate_precision("precision", self.diff.precision)
            .map_err(|e| anyhow::anyhow!("diff.{e}"))?;
        validate_precision("perceptual_precision", self.diff.perceptual_precision)
            .map_err(|e| anyhow::anyhow!("diff.{e}"))?;
        Ok(())
    }
}

pub fn parse(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load `.snapdiff/config.toml`. A missing file means all defaults.
pub fn load() -> Result<Config> {
    load_from(&Path::new(CONFIG_DIR).join(CONFIG_FILE))
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.diff.precision, 1.0);
        assert_eq!(config.diff.perceptual_precision, 1.0);
        assert_eq!(config.diff.formula, DeltaEFormula::Cie94);
        assert!(config.diff.perceptual);
        assert_eq!(config.diff.alpha, AlphaMode::Premultiplied);
    }

    #[test]
    fn parses_every_key() {
        let config = parse(
            r#"
            [diff]
            precision = 0.99
            perceptual_precision = 0.98
            formula = "ciede2000"
            perceptual = false
            alpha = "straight"
            placeholder = "empty.png"
            "#,
        )
        .unwrap();
        assert_eq!(config.diff.precision, 0.99);
        assert_eq!(config.diff.perceptual_precision, 0.98);
        assert_eq!(config.diff.formula, DeltaEFormula::Ciede2000);
        assert!(!config.diff.perceptual);
        assert_eq!(config.diff.alpha, AlphaMode::Straight);
        assert_eq!(config.diff.placeholder, Some(PathBuf::from("empty.png")));
    }

    #[test]
    fn rejects_out_of_range_precision() {
        let err = parse("[diff]\nperceptual_precision = 2.0\n").unwrap_err();
        assert!(format!("{err:#}").contains("diff.perceptual_precision"));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.diff.precision, 1.0);
    }

    #[test]
    fn template_parses() {
        let config = parse(template::CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.diff.precision, 1.0);
    }
}
