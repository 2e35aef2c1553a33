use std::path::Path;

use crate::error::Error;

/// Default asset directory name: images for `X.md` live under `image/X/`
/// next to the document. Overridable per run, never hard-coded downstream.
const DEFAULT_IMAGE_DIR: &str = "image";
/// Default directory unused assets are moved into by `prune`.
const DEFAULT_BACKUP_DIR: &str = "backup";
/// Default per-request timeout for remote fetches and existence checks.
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default worker thread count for remote downloads and checks.
const DEFAULT_WORKERS: usize = 5;

/// Project configuration loaded from `.mdimg.toml` in the working directory.
/// Include/exclude patterns are path prefixes applied to markdown files
/// found under the input directory.
pub struct Config {
    /// Directory unused assets are moved into, relative to the working
    /// directory unless absolute.
    pub backup_dir: String,
    /// Path prefixes excluded from scanning.
    pub exclude: Vec<String>,
    /// Asset directory name placed next to each document.
    pub image_dir: String,
    /// Path prefixes included in scanning; empty means everything.
    pub include: Vec<String>,
    /// Optional proxy URL applied to all remote traffic.
    pub proxy: Option<String>,
    /// Per-request timeout in seconds for remote traffic.
    pub timeout_secs: u64,
    /// Worker thread count for remote downloads and existence checks.
    pub workers: usize,
}

/// Raw TOML structure for `.mdimg.toml`.
#[derive(serde::Deserialize)]
struct MdimgToml {
    backup_dir: Option<String>,
    #[serde(default)]
    exclude: Vec<String>,
    image_dir: Option<String>,
    #[serde(default)]
    include: Vec<String>,
    proxy: Option<String>,
    timeout_secs: Option<u64>,
    workers: Option<usize>,
}

impl Config {
    /// Load config from `.mdimg.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist. Returns an error if the
    /// file exists but is malformed — never silently falls back to defaults
    /// when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".mdimg.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::defaults()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: MdimgToml = toml::from_str(&content)?;
        Ok(Self {
            backup_dir: raw
                .backup_dir
                .unwrap_or_else(|| DEFAULT_BACKUP_DIR.to_string()),
            exclude: raw.exclude,
            image_dir: raw
                .image_dir
                .unwrap_or_else(|| DEFAULT_IMAGE_DIR.to_string()),
            include: raw.include,
            proxy: raw.proxy,
            timeout_secs: raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            workers: raw.workers.unwrap_or(DEFAULT_WORKERS).max(1),
        })
    }

    /// Built-in defaults: scan everything, `image/` asset dirs, `backup/`
    /// for pruned files.
    fn defaults() -> Self {
        Self {
            backup_dir: DEFAULT_BACKUP_DIR.to_string(),
            exclude: Vec::new(),
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
            include: Vec::new(),
            proxy: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Check whether a markdown file path should be processed.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude
    /// pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|p| relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        !self
            .exclude
            .iter()
            .any(|p| relative_path.starts_with(p.as_str()))
    }
}
