use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use snapdiff::{ImageCodec, Mismatch, PngCodec, Snapshot, Verdict};
use tracing::{debug, info};

use crate::config::ResolvedRunConfig;
use crate::report::SnapshotStatus;
use crate::report::terminal;

/// `snapdiff compare` — compare one candidate against one reference.
/// Returns exit code: 0 = match, 1 = mismatch.
pub async fn compare(
    config: ResolvedRunConfig,
    reference: PathBuf,
    candidate: PathBuf,
    scale: f32,
    output: PathBuf,
) -> Result<i32> {
    let comparator = config.comparator()?;
    let precision = config.precision;

    let reference_png = std::fs::read(&reference)
        .with_context(|| format!("Failed to read {}", reference.display()))?;
    let candidate_png = std::fs::read(&candidate)
        .with_context(|| format!("Failed to read {}", candidate.display()))?;

    let start = Instant::now();
    let (reference_snap, candidate_snap, verdict) = tokio::task::spawn_blocking(move || {
        let reference = Snapshot::from_encoded(reference_png, scale);
        let candidate = Snapshot::from_encoded(candidate_png, scale);
        let verdict = comparator.compare(&reference, &candidate, precision);
        (reference, candidate, verdict)
    })
    .await
    .context("Diff task panicked")?;
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "compared");

    let name = candidate.display().to_string();
    match verdict {
        Verdict::Match => {
            terminal::print_line(&name, &SnapshotStatus::Pass, start.elapsed());
            Ok(0)
        }
        Verdict::Mismatch(mismatch) => {
            let status = SnapshotStatus::Fail(mismatch.message());
            terminal::print_line(&name, &status, start.elapsed());
            let written = write_artifacts(&output, &mismatch, &reference_snap, &candidate_snap)?;
            if written > 0 {
                info!(dir = %output.display(), written, "artifacts written");
            }
            Ok(1)
        }
    }
}

/// Write `reference.png`, `failure.png` and `difference.png` into `dir`.
fn write_artifacts(
    dir: &Path,
    mismatch: &Mismatch,
    reference: &Snapshot,
    candidate: &Snapshot,
) -> Result<usize> {
    let artifacts = mismatch.artifacts(reference, candidate);
    if artifacts.is_empty() {
        return Ok(0);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
    for artifact in &artifacts {
        let path = dir.join(format!("{}.png", artifact.name));
        let png = PngCodec
            .encode(artifact.image)
            .with_context(|| format!("Failed to encode {} image", artifact.name))?;
        std::fs::write(&path, png)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(artifacts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use snapdiff::Precision;

    #[test]
    fn writes_three_artifacts_on_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let reference = Snapshot::from(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        let candidate = Snapshot::from(RgbaImage::from_pixel(4, 5, Rgba([0, 0, 0, 255])));
        let verdict = snapdiff::compare(&reference, &candidate, Precision::EXACT);

        let written =
            write_artifacts(dir.path(), verdict.mismatch().unwrap(), &reference, &candidate)
                .unwrap();
        assert_eq!(written, 3);
        for name in ["reference", "failure", "difference"] {
            assert!(dir.path().join(format!("{name}.png")).exists(), "{name}");
        }
        let diff = image::open(dir.path().join("difference.png")).unwrap();
        assert_eq!((diff.width(), diff.height()), (4, 5));
    }

    #[test]
    fn unloadable_inputs_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let reference = Snapshot::from_encoded(b"junk".to_vec(), 1.0);
        let candidate = Snapshot::from(RgbaImage::new(1, 1));
        let verdict = snapdiff::compare(&reference, &candidate, Precision::EXACT);

        let written =
            write_artifacts(&out, verdict.mismatch().unwrap(), &reference, &candidate).unwrap();
        assert_eq!(written, 0);
        assert!(!out.exists());
    }
}
