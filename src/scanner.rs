use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;

/// Discover the markdown documents a run will process.
///
/// A single `.md` file is processed as-is; a directory is walked
/// recursively with the config's include/exclude filters applied to paths
/// relative to it. Results are sorted so batch output is deterministic.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the path is neither a markdown file
/// nor a directory.
pub fn discover(root: &Path, config: &Config) -> Result<Vec<PathBuf>, Error> {
    if root.is_file() {
        if root.extension().is_some_and(|ext| ext == "md") {
            return Ok(vec![root.to_path_buf()]);
        }
        return Err(Error::InvalidInput {
            path: root.to_path_buf(),
        });
    }

    if !root.is_dir() {
        return Err(Error::InvalidInput {
            path: root.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .map(|e| e.path().to_path_buf())
        .filter(|path| {
            let relative = path.strip_prefix(root).unwrap_or(path);
            config.should_scan(&relative.to_string_lossy())
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all() -> Config {
        Config::load(Path::new("/nonexistent-config-root")).unwrap()
    }

    #[test]
    fn finds_markdown_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.md"), "b").unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = discover(dir.path(), &scan_all()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.md"));
        assert!(files[1].ends_with("sub/b.md"));
    }

    #[test]
    fn single_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.md");
        std::fs::write(&doc, "x").unwrap();
        let files = discover(&doc, &scan_all()).unwrap();
        assert_eq!(files, vec![doc]);
    }

    #[test]
    fn non_markdown_file_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("doc.txt");
        std::fs::write(&other, "x").unwrap();
        assert!(matches!(
            discover(&other, &scan_all()),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn missing_path_is_invalid_input() {
        assert!(matches!(
            discover(Path::new("/no/such/path"), &scan_all()),
            Err(Error::InvalidInput { .. })
        ));
    }
}
