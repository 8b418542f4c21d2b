use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CliOverrides;

pub(crate) fn parse_precision(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    snapdiff::validate_precision("precision", v).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(
    name = "snapdiff",
    about = "Compare rendered images against accepted references"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create .snapdiff/config.toml with default settings
    Init {
        /// Overwrite existing config and gitignore
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Compare one candidate image against a reference (exit 0/1)
    Compare {
        /// Reference image (PNG)
        reference: PathBuf,
        /// Candidate image (PNG)
        candidate: PathBuf,
        /// Logical-to-physical pixel scale of both images
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        /// Directory for reference/failure/difference images on mismatch
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,
        #[command(flatten)]
        diff: CliOverrides,
    },

    /// Compare every current/ snapshot with its reference (exit 0/1)
    Test {
        /// Only compare snapshots whose name contains PATTERN (case-insensitive)
        #[arg(long, short = 'f')]
        filter: Option<String>,
        #[command(flatten)]
        diff: CliOverrides,
    },

    /// Promote current/ snapshots to reference/
    Approve {
        /// Only approve snapshots whose name contains PATTERN (case-insensitive)
        #[arg(long, short = 'f')]
        filter: Option<String>,
        /// Only approve new snapshots (no prior reference)
        #[arg(long)]
        new: bool,
        /// Only approve failed snapshots (have a diff)
        #[arg(long)]
        failed: bool,
        /// Approve all pending snapshots (default when no kind flags)
        #[arg(long)]
        all: bool,
    },
}
