//! Run-scoped caches shared across worker threads.
//!
//! The same URL or local path tends to recur many times across a document
//! set, so download results and validity verdicts are cached for the
//! lifetime of one run. The cache is an explicit object passed into the
//! pipelines — never process-global state — which keeps runs independent
//! and lets tests inject a fresh one. Workers race on it; the first writer
//! wins and later writers are dropped. Duplicate downloads of one URL
//! before the cache is populated are tolerated.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Shared per-run memory: URL → downloaded file, location → validity verdict.
#[derive(Debug, Default)]
pub struct RunCache {
    downloads: Mutex<HashMap<String, PathBuf>>,
    validity: Mutex<HashMap<String, bool>>,
}

impl RunCache {
    /// An empty cache for a fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// The local file a URL was already downloaded to in this run, if any.
    /// Failed downloads are not cached, so they are retried on recurrence.
    pub fn downloaded(&self, url: &str) -> Option<PathBuf> {
        self.downloads
            .lock()
            .map(|map| map.get(url).cloned())
            .unwrap_or_default()
    }

    /// Record a completed download. First writer wins.
    pub fn record_download(&self, url: &str, path: PathBuf) {
        if let Ok(mut map) = self.downloads.lock() {
            map.entry(url.to_string()).or_insert(path);
        }
    }

    /// A previously computed validity verdict for a canonical location.
    pub fn verdict(&self, location: &str) -> Option<bool> {
        self.validity
            .lock()
            .map(|map| map.get(location).copied())
            .unwrap_or_default()
    }

    /// Record a validity verdict. First writer wins; both verdicts are
    /// cached, a failed check is as reusable as a successful one.
    pub fn record_verdict(&self, location: &str, valid: bool) {
        if let Ok(mut map) = self.validity.lock() {
            map.entry(location.to_string()).or_insert(valid);
        }
    }
}
