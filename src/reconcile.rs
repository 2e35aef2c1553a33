//! Unused-asset reconciliation: the set difference between what a
//! document's asset directory holds and what the document references.
//!
//! Both sides of the difference go through [`resolve::canonical_key`] —
//! the same function, not a lookalike. The comparison is only safe while
//! that stays true; a normalization asymmetry here would delete files that
//! are actually in use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::extract::Extraction;
use crate::resolve::{self, canonical_key};
use crate::types::CanonicalLocation;

/// What to do with unused assets: move them aside or remove them.
/// Never both.
pub enum PruneMode {
    /// Move each unused file into this directory.
    Backup(PathBuf),
    /// Delete each unused file.
    Delete,
}

/// The files in an asset directory that no reference points at.
pub struct PrunePlan {
    /// Canonical paths of unused files, sorted for deterministic output.
    pub unused: Vec<PathBuf>,
}

/// Result of applying a prune plan. A failure on one file never stops the
/// remaining files from being processed.
#[derive(Default)]
pub struct PruneOutcome {
    /// Files that could not be moved or deleted, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    /// Files successfully moved or deleted.
    pub handled: Vec<PathBuf>,
}

/// The canonical local paths a document references, across all four forms.
pub fn referenced_assets(extraction: &Extraction, document_dir: &Path) -> HashSet<PathBuf> {
    let mut referenced = HashSet::new();
    for record in &extraction.records {
        let Some((target, _)) = extraction.effective_target(record) else {
            continue;
        };
        let resolved = resolve::classify(&target, document_dir);
        if let CanonicalLocation::LocalPath(path) = resolved.canonical {
            referenced.insert(path);
        }
    }
    referenced
}

/// Walk the asset directory and keep every file the referenced set does
/// not account for.
pub fn plan(referenced: &HashSet<PathBuf>, asset_dir: &Path) -> PrunePlan {
    let mut unused: Vec<PathBuf> = WalkDir::new(asset_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| canonical_key(e.path()))
        .filter(|path| !referenced.contains(path))
        .collect();
    unused.sort();
    PrunePlan { unused }
}

/// Apply the plan: move to backup or delete, collecting per-file failures.
pub fn apply(plan: &PrunePlan, mode: &PruneMode) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();

    if let PruneMode::Backup(backup_dir) = mode
        && let Err(e) = std::fs::create_dir_all(backup_dir)
    {
        for path in &plan.unused {
            outcome
                .failures
                .push((path.clone(), format!("backup dir: {e}")));
        }
        return outcome;
    }

    for path in &plan.unused {
        let result = match mode {
            PruneMode::Backup(backup_dir) => {
                let dest = backup_destination(backup_dir, path);
                move_file(path, &dest).map(|()| info!("backed up: {} -> {}", path.display(), dest.display()))
            }
            PruneMode::Delete => std::fs::remove_file(path)
                .map(|()| info!("removed: {}", path.display())),
        };
        match result {
            Ok(()) => outcome.handled.push(path.clone()),
            Err(e) => {
                warn!("prune failed: {}: {e}", path.display());
                outcome.failures.push((path.clone(), e.to_string()));
            }
        }
    }
    outcome
}

/// Unused files keep their basename under the backup directory.
fn backup_destination(backup_dir: &Path, path: &Path) -> PathBuf {
    match path.file_name() {
        Some(name) => backup_dir.join(name),
        None => backup_dir.join("unnamed"),
    }
}

/// Rename, falling back to copy-and-remove across filesystems.
fn move_file(src: &Path, dest: &Path) -> std::io::Result<()> {
    if std::fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    std::fs::copy(src, dest)?;
    std::fs::remove_file(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;

    fn referenced_for(dir: &Path, content: &str) -> HashSet<PathBuf> {
        let extraction = Extractor::new().extract(content);
        referenced_assets(&extraction, dir)
    }

    #[test]
    fn difference_is_exactly_the_unreferenced_files() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("image/doc");
        std::fs::create_dir_all(&assets).unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            std::fs::write(assets.join(name), b"x").unwrap();
        }

        let referenced = referenced_for(
            dir.path(),
            "![a](image/doc/a.png)\n![b](image/doc/b.png)\n",
        );
        let plan = plan(&referenced, &assets);
        assert_eq!(plan.unused.len(), 1);
        assert!(plan.unused[0].ends_with("c.png"));
    }

    #[test]
    fn fully_referenced_directory_has_no_unused_files() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("image/doc");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("a.png"), b"x").unwrap();

        let referenced = referenced_for(dir.path(), "![a](image/doc/a.png)\n");
        assert!(plan(&referenced, &assets).unused.is_empty());
    }

    #[test]
    fn dot_segments_and_encoding_do_not_cause_false_positives() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("image/doc");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("a b.png"), b"x").unwrap();
        std::fs::write(assets.join("c.png"), b"x").unwrap();

        // One reference percent-encoded, one through a redundant `..`.
        let referenced = referenced_for(
            dir.path(),
            "![a](image/doc/a%20b.png)\n![c](image/../image/doc/c.png)\n",
        );
        assert!(plan(&referenced, &assets).unused.is_empty());
    }

    #[test]
    fn backup_moves_files_and_keeps_going_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("image/doc");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("orphan.png"), b"x").unwrap();

        let backup = dir.path().join("backup");
        let mut target = plan(&HashSet::new(), &assets);
        // A path that no longer exists must fail without stopping the rest.
        target.unused.insert(0, assets.join("ghost.png"));

        let outcome = apply(&target, &PruneMode::Backup(backup.clone()));
        assert_eq!(outcome.handled.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(backup.join("orphan.png").exists());
        assert!(!assets.join("orphan.png").exists());
    }

    #[test]
    fn delete_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("image/doc");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("orphan.png"), b"x").unwrap();

        let target = plan(&HashSet::new(), &assets);
        let outcome = apply(&target, &PruneMode::Delete);
        assert_eq!(outcome.handled.len(), 1);
        assert!(outcome.failures.is_empty());
        assert!(!assets.join("orphan.png").exists());
    }
}
