use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::CONFIG_DIR;

pub const REFERENCE_DIR: &str = "reference";
pub const CURRENT_DIR: &str = "current";
pub const DIFFERENCE_DIR: &str = "difference";

/// Snapshot PNGs on disk, keyed by id (relative path without `.png`):
/// `<root>/reference/<id>.png`, `<root>/current/<id>.png`,
/// `<root>/difference/<id>.png`.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(CONFIG_DIR)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn write_file(path: &Path, png: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, png).with_context(|| format!("Failed to write {}", path.display()))
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, subdir: &str, id: &str) -> PathBuf {
        self.root.join(subdir).join(format!("{id}.png"))
    }

    /// Promote a snapshot to reference and drop its stale current/difference.
    pub fn write_reference(&self, id: &str, png: &[u8]) -> Result<()> {
        write_file(&self.file_path(REFERENCE_DIR, id), png)?;
        self.clean_output(id);
        Ok(())
    }

    pub fn write_difference(&self, id: &str, png: &[u8]) -> Result<()> {
        write_file(&self.file_path(DIFFERENCE_DIR, id), png)
    }

    pub fn read_reference(&self, id: &str) -> Option<Vec<u8>> {
        std::fs::read(self.file_path(REFERENCE_DIR, id)).ok()
    }

    pub fn read_current(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.file_path(CURRENT_DIR, id);
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn has_difference(&self, id: &str) -> bool {
        self.file_path(DIFFERENCE_DIR, id).exists()
    }

    pub fn clean_difference(&self, id: &str) {
        let _ = std::fs::remove_file(self.file_path(DIFFERENCE_DIR, id));
    }

    fn clean_output(&self, id: &str) {
        let _ = std::fs::remove_file(self.file_path(CURRENT_DIR, id));
        self.clean_difference(id);
    }

    /// Remove every file under `difference/`.
    pub fn clear_differences(&self) {
        let dir = self.root.join(DIFFERENCE_DIR);
        if dir.exists() {
            let _ = std::fs::remove_dir_all(&dir);
            let _ = std::fs::create_dir_all(&dir);
        }
    }

    pub fn list_current_ids(&self) -> BTreeSet<String> {
        let dir = self.root.join(CURRENT_DIR);
        let mut ids = BTreeSet::new();
        collect_png_ids(&dir, &dir, &mut ids);
        ids
    }
}

/// Recursively collect `.png` files under `dir` as ids relative to `base`.
fn collect_png_ids(base: &Path, dir: &Path, ids: &mut BTreeSet<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_png_ids(base, &path, ids);
        } else if path.extension().is_some_and(|e| e == "png")
            && let Ok(rel) = path.strip_prefix(base)
        {
            let id = rel.with_extension("");
            ids.insert(id.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Case-insensitive substring match that treats `_` and ` ` alike and
/// ignores a trailing `.png` on the pattern.
pub fn matches_filter(id: &str, pattern: &str) -> bool {
    let pattern = pattern.strip_suffix(".png").unwrap_or(pattern);
    normalize(id).contains(&normalize(pattern))
}

fn normalize(s: &str) -> String {
    s.to_lowercase().replace('_', " ")
}
