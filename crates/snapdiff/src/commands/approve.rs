use anyhow::Result;

use crate::store::{self, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    New,
    Failed,
    Unchanged,
}

/// `snapdiff approve` — promote current/ snapshots to reference/.
pub fn approve(filter: Option<&str>, new_only: bool, failed_only: bool, all: bool) -> Result<()> {
    let (new_only, failed_only) = if all {
        (false, false)
    } else {
        (new_only, failed_only)
    };
    promote(&Store::default(), filter, new_only, failed_only).map(|_| ())
}

fn classify(store: &Store, id: &str) -> Kind {
    if store.has_difference(id) {
        Kind::Failed
    } else if store.read_reference(id).is_none() {
        Kind::New
    } else {
        Kind::Unchanged
    }
}

/// Returns the number of snapshots promoted.
fn promote(
    store: &Store,
    filter: Option<&str>,
    new_only: bool,
    failed_only: bool,
) -> Result<usize> {
    let ids = store.list_current_ids();
    if ids.is_empty() {
        println!("Nothing to approve — current/ is empty.");
        return Ok(0);
    }

    let selected: Vec<(&str, Kind)> = ids
        .iter()
        .map(|id| (id.as_str(), classify(store, id)))
        .filter(|(_, kind)| {
            if new_only {
                *kind == Kind::New
            } else if failed_only {
                *kind == Kind::Failed
            } else {
                true
            }
        })
        .filter(|(id, _)| filter.is_none_or(|pat| store::matches_filter(id, pat)))
        .collect();

    if selected.is_empty() {
        println!("No snapshots matched the given filters.");
        return Ok(0);
    }

    let mut count_new = 0usize;
    let mut count_failed = 0usize;
    for (id, kind) in &selected {
        let png = store.read_current(id)?;
        store.write_reference(id, &png)?;
        let label = match kind {
            Kind::Failed => {
                count_failed += 1;
                "\x1b[31mFAIL\x1b[0m"
            }
            Kind::New => {
                count_new += 1;
                "\x1b[33m NEW\x1b[0m"
            }
            Kind::Unchanged => "\x1b[32mPASS\x1b[0m",
        };
        println!("  Approved  {label}  {id}");
    }

    println!();
    println!(
        "{} snapshot(s) approved ({count_new} new, {count_failed} failed).",
        selected.len()
    );
    Ok(selected.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        for id in ["new_one", "failed_one"] {
            let path = dir.path().join(store::CURRENT_DIR).join(format!("{id}.png"));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, id.as_bytes()).unwrap();
        }
        store.write_reference("failed_one", b"old").unwrap();
        let path = dir.path().join(store::CURRENT_DIR).join("failed_one.png");
        std::fs::write(path, b"failed_one").unwrap();
        store.write_difference("failed_one", b"diff").unwrap();
        (dir, store)
    }

    #[test]
    fn promotes_everything_by_default() {
        let (_dir, store) = setup();
        assert_eq!(promote(&store, None, false, false).unwrap(), 2);
        assert_eq!(store.read_reference("new_one").unwrap(), b"new_one");
        assert_eq!(store.read_reference("failed_one").unwrap(), b"failed_one");
        assert!(!store.has_difference("failed_one"));
        assert!(store.list_current_ids().is_empty());
    }

    #[test]
    fn kind_flags_select_subset() {
        let (_dir, store) = setup();
        assert_eq!(promote(&store, None, true, false).unwrap(), 1);
        assert_eq!(store.read_reference("new_one").unwrap(), b"new_one");
        assert_eq!(store.read_reference("failed_one").unwrap(), b"old");
    }

    #[test]
    fn pattern_filter_applies() {
        let (_dir, store) = setup();
        assert_eq!(promote(&store, Some("failed one"), false, false).unwrap(), 1);
        assert!(store.read_reference("new_one").is_none());
    }
}
