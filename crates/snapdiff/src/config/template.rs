use std::path::Path;

use anyhow::{Context, Result};

use super::{CONFIG_DIR, CONFIG_FILE};

/// Hand-crafted config template with commented-out keys, so users can see
/// the available knobs.
pub(crate) const CONFIG_TEMPLATE: &str = r#"# ─────────────────────────────────────────────────────────
# Comparison — all fields optional.
# ─────────────────────────────────────────────────────────
[diff]
# precision = 1.0                   # fraction of bytes that must match (1.0 = exact)
# perceptual_precision = 1.0        # per-pixel closeness, 1 - max Delta-E / 100
# formula = "cie94"                 # "cie94" | "ciede2000"
# perceptual = true                 # false = byte tolerance only
# alpha = "premultiplied"           # "premultiplied" | "straight"
# placeholder = "empty.png"         # shown instead of an empty candidate
"#;

pub fn config_file_exists() -> bool {
    Path::new(CONFIG_DIR).join(CONFIG_FILE).exists()
}

pub fn write_gitignore(force: bool) -> Result<()> {
    let path = Path::new(CONFIG_DIR).join(".gitignore");
    if !force && path.exists() {
        return Ok(());
    }
    std::fs::write(&path, "current/\ndifference/\n")
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_template() -> Result<()> {
    let dir = Path::new(CONFIG_DIR);
    std::fs::create_dir_all(dir).context("Failed to create .snapdiff directory")?;
    let path = dir.join(CONFIG_FILE);
    std::fs::write(&path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
