//! Remote-image localization: download every remote reference into the
//! document's asset directory and rewrite each reference to the relative
//! local path.
//!
//! Downloads run on a worker pool; everything else is single-threaded.
//! Worker results are keyed by record index and replayed in span order, so
//! the final text is identical regardless of completion order. One failed
//! fetch fails only its own record — the original reference text stays.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use sha2::{Digest as _, Sha256};
use url::Url;

use crate::cache::RunCache;
use crate::error::Error;
use crate::extract::{Extraction, Extractor};
use crate::fetch::Fetcher;
use crate::resolve::{self, canonical_key};
use crate::rewrite;
use crate::types::{
    CanonicalLocation, ReferenceForm, ReferenceRecord, RewriteDecision, RunCounts, TargetKind,
};

/// Per-run localization settings, merged from config and CLI flags.
pub struct LocalizeOptions {
    /// Also copy local references into the asset directory and rewrite them.
    pub copy_local: bool,
    /// Asset directory name placed next to each document.
    pub image_dir: String,
    /// Worker thread count for downloads.
    pub workers: usize,
}

/// What the pipeline intends to do with one record.
enum Planned {
    /// Copy an existing local file into the asset directory.
    CopyLocal(PathBuf),
    /// Fetch a remote URL into the asset directory.
    Download(String),
    /// Leave the record untouched.
    Skip,
}

/// A download handed to the worker pool, keyed by record index.
struct DownloadJob {
    index: usize,
    url: String,
}

/// Localize a single document in place. Returns the per-record counters.
///
/// # Errors
///
/// Returns `Error::Io` if the document cannot be read or written, or
/// `Error::SpanOverlap` if the rewrite engine detects span corruption —
/// in both cases the file on disk is left untouched.
pub fn localize_file(
    doc: &Path,
    options: &LocalizeOptions,
    fetcher: &dyn Fetcher,
    cache: &RunCache,
) -> Result<RunCounts, Error> {
    let text = std::fs::read_to_string(doc)?;
    let extraction = Extractor::new().extract(&text);

    let doc_dir = resolve::document_dir(doc);
    let asset_dir = asset_dir_for(doc, &options.image_dir);
    std::fs::create_dir_all(&asset_dir)?;

    let plan = plan_records(&extraction, doc_dir, options);
    let downloads: Vec<DownloadJob> = plan
        .iter()
        .enumerate()
        .filter_map(|(index, planned)| match planned {
            Planned::Download(url) => Some(DownloadJob {
                index,
                url: url.clone(),
            }),
            Planned::CopyLocal(_) | Planned::Skip => None,
        })
        .collect();
    let results = run_download_pool(downloads, &asset_dir, options.workers, fetcher, cache);

    let mut counts = RunCounts::default();
    let mut decisions = Vec::with_capacity(extraction.records.len());
    for (index, record) in extraction.records.iter().enumerate() {
        let decision = match plan.get(index) {
            Some(Planned::Download(_)) => match results.get(&index) {
                Some(Some(local)) => {
                    counts.succeeded += 1;
                    localized_decision(&text, record, &extraction, doc_dir, local)
                }
                _ => {
                    counts.failed += 1;
                    RewriteDecision::Unchanged
                }
            },
            Some(Planned::CopyLocal(source)) => match copy_local_asset(source, &asset_dir) {
                Some(local) => {
                    counts.succeeded += 1;
                    localized_decision(&text, record, &extraction, doc_dir, &local)
                }
                None => {
                    counts.failed += 1;
                    RewriteDecision::Unchanged
                }
            },
            _ => {
                counts.skipped += 1;
                RewriteDecision::Unchanged
            }
        };
        decisions.push(decision);
    }

    let new_text = rewrite::apply(&text, &extraction.records, &decisions)?;
    if new_text != text {
        std::fs::write(doc, new_text)?;
        info!("updated: {}", doc.display());
    }
    Ok(counts)
}

/// Classify every record into a planned action.
fn plan_records(extraction: &Extraction, doc_dir: &Path, options: &LocalizeOptions) -> Vec<Planned> {
    extraction
        .records
        .iter()
        .map(|record| {
            // Definitions stay where they are; shortcut uses get inlined.
            if record.form == ReferenceForm::ReferenceDefinition {
                return Planned::Skip;
            }
            let Some((target, _)) = extraction.effective_target(record) else {
                return Planned::Skip;
            };
            let resolved = resolve::classify(&target, doc_dir);
            match (resolved.kind, resolved.canonical) {
                (TargetKind::Remote, CanonicalLocation::RemoteUrl(url)) => Planned::Download(url),
                (
                    TargetKind::LocalRelative | TargetKind::LocalAbsolute,
                    CanonicalLocation::LocalPath(path),
                ) if options.copy_local => Planned::CopyLocal(path),
                _ => Planned::Skip,
            }
        })
        .collect()
}

/// Run the downloads on a bounded pool of worker threads. Results come back
/// keyed by record index; completion order is irrelevant.
fn run_download_pool(
    downloads: Vec<DownloadJob>,
    asset_dir: &Path,
    workers: usize,
    fetcher: &dyn Fetcher,
    cache: &RunCache,
) -> HashMap<usize, Option<PathBuf>> {
    if downloads.is_empty() {
        return HashMap::new();
    }

    let worker_count = workers.clamp(1, downloads.len());
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<DownloadJob>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Option<PathBuf>)>();
    for job in downloads {
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let outcome = download_one(&job.url, asset_dir, fetcher, cache);
                    let _ = result_tx.send((job.index, outcome));
                }
            });
        }
    });
    drop(result_tx);

    result_rx.try_iter().collect()
}

/// Fetch one URL into the asset directory, or reuse this run's earlier
/// download of the same URL. Failures are logged and resolve to `None`.
fn download_one(
    url: &str,
    asset_dir: &Path,
    fetcher: &dyn Fetcher,
    cache: &RunCache,
) -> Option<PathBuf> {
    if let Some(path) = cache.downloaded(url) {
        return Some(path);
    }

    let bytes = match fetcher.fetch(url) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("{e}");
            return None;
        }
    };

    let path = asset_dir.join(asset_filename(url));
    if let Err(e) = std::fs::write(&path, bytes) {
        error!("write failed: {}: {e}", path.display());
        return None;
    }
    cache.record_download(url, path.clone());
    info!("downloaded: {url} -> {}", path.display());
    Some(path)
}

/// Copy a referenced local file into the asset directory. A file already
/// inside the asset directory is left alone and reported as its own copy.
fn copy_local_asset(source: &Path, asset_dir: &Path) -> Option<PathBuf> {
    if !source.exists() {
        warn!("image missing: {}", source.display());
        return None;
    }
    let name = source.file_name()?;
    let dest = asset_dir.join(name);
    if canonical_key(&dest) == canonical_key(source) {
        return Some(dest);
    }
    match std::fs::copy(source, &dest) {
        Ok(_) => {
            info!("copied: {} -> {}", source.display(), dest.display());
            Some(dest)
        }
        Err(e) => {
            error!("copy failed: {}: {e}", source.display());
            None
        }
    }
}

/// Build the replacement text for a successfully localized record.
/// Inline and shortcut forms re-serialize to the inline form; HTML tags get
/// only their `src` value substituted.
fn localized_decision(
    text: &str,
    record: &ReferenceRecord,
    extraction: &Extraction,
    doc_dir: &Path,
    local: &Path,
) -> RewriteDecision {
    let target = relative_markdown_target(doc_dir, local);
    match record.form {
        ReferenceForm::InlineMarkdown | ReferenceForm::ShortcutReference => {
            let title = extraction
                .effective_target(record)
                .map_or_else(String::new, |(_, title)| title);
            RewriteDecision::Replace(rewrite::render_inline(&record.alt, &target, &title))
        }
        ReferenceForm::HtmlTag => {
            let tag = text.get(record.span.clone()).unwrap_or("");
            rewrite::replace_img_src(tag, &target)
                .map_or(RewriteDecision::Unchanged, RewriteDecision::Replace)
        }
        ReferenceForm::ReferenceDefinition => RewriteDecision::Unchanged,
    }
}

/// The asset directory convention: images for `X.md` live under
/// `<image_dir>/X/` next to the document. The directory name is a config
/// value, never fixed here.
pub fn asset_dir_for(doc: &Path, image_dir: &str) -> PathBuf {
    let stem = doc
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    resolve::document_dir(doc).join(image_dir).join(stem)
}

/// The path written back into the document: the asset's location relative
/// to the document's own directory, with forward slashes.
fn relative_markdown_target(doc_dir: &Path, asset: &Path) -> String {
    let dir = canonical_key(doc_dir);
    let target = canonical_key(asset);
    let dir_parts: Vec<_> = dir.components().collect();
    let target_parts: Vec<_> = target.components().collect();
    let common = dir_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..dir_parts.len() {
        parts.push("..".to_string());
    }
    for comp in &target_parts[common..] {
        parts.push(comp.as_os_str().to_string_lossy().into_owned());
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Name the downloaded asset by the basename of the URL path. A URL with
/// no usable basename gets a collision-resistant synthetic name with a
/// default extension.
fn asset_filename(url: &str) -> String {
    let basename = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty());

    basename.unwrap_or_else(|| {
        let digest = Sha256::digest(url.as_bytes());
        let hex = format!("{digest:x}");
        format!("image-{}.png", &hex[..16])
    })
}
