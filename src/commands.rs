//! Core CLI commands for mdimg: localize, check, prune, zoom, stats.
//!
//! Every command walks the same discovery path and treats per-document
//! failures as data: one unreadable file or one corrupt rewrite never
//! stops the rest of the batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use log::{error, info, warn};

use crate::cache::RunCache;
use crate::config::Config;
use crate::error::Error;
use crate::extract::Extractor;
use crate::fetch::HttpFetcher;
use crate::localize::{self, LocalizeOptions};
use crate::reconcile::{self, PruneMode};
use crate::resolve;
use crate::scanner;
use crate::stats::DocumentStats;
use crate::validate::{self, InvalidRef};
use crate::zoom::Zoomer;

/// Validate every reference in every discovered document and print the
/// unreachable ones.
///
/// # Errors
///
/// Returns errors from config loading, discovery, or HTTP client setup.
pub fn check(path: &Path, proxy: Option<String>) -> Result<ExitCode, Error> {
    let config = Config::load(Path::new("."))?;
    let files = scanner::discover(path, &config)?;
    let proxy = proxy.or_else(|| config.proxy.clone());
    let fetcher = HttpFetcher::new(Duration::from_secs(config.timeout_secs), proxy.as_deref())?;
    let cache = RunCache::new();

    let mut report: BTreeMap<String, Vec<InvalidRef>> = BTreeMap::new();
    let mut unreadable = 0u32;
    for file in &files {
        info!("checking: {}", file.display());
        match validate::validate_document(file, &fetcher, &cache, config.workers) {
            Ok(invalid) if invalid.is_empty() => {}
            Ok(invalid) => {
                report.insert(file.display().to_string(), invalid);
            }
            Err(e) => {
                unreadable += 1;
                error!("{}: {e}", file.display());
            }
        }
    }

    for (file, invalid) in &report {
        for entry in invalid {
            println!("INVALID  {file}: {} ({})", entry.raw_target, entry.reason);
        }
    }

    let invalid_count: usize = report.values().map(Vec::len).sum();
    // Exit code priority: unreadable (2) > invalid (1) > clean (0).
    if unreadable > 0 {
        println!();
        println!("{invalid_count} invalid references, {unreadable} unreadable files");
        Ok(ExitCode::from(2))
    } else if invalid_count > 0 {
        println!();
        println!("{invalid_count} invalid references");
        Ok(ExitCode::from(1))
    } else {
        let total = files.len();
        println!("All image references valid in {total} files");
        Ok(ExitCode::SUCCESS)
    }
}

/// Download remote images next to each document and rewrite references to
/// the local copies.
///
/// # Errors
///
/// Returns errors from config loading, discovery, or HTTP client setup.
/// Per-document failures are logged and do not abort the batch.
pub fn localize(
    path: &Path,
    image_dir: Option<String>,
    copy_local: bool,
    proxy: Option<String>,
) -> Result<(), Error> {
    let config = Config::load(Path::new("."))?;
    let files = scanner::discover(path, &config)?;
    let proxy = proxy.or_else(|| config.proxy.clone());
    let fetcher = HttpFetcher::new(Duration::from_secs(config.timeout_secs), proxy.as_deref())?;
    let cache = RunCache::new();
    let options = LocalizeOptions {
        copy_local,
        image_dir: image_dir.unwrap_or_else(|| config.image_dir.clone()),
        workers: config.workers,
    };

    let mut totals = crate::types::RunCounts::default();
    let mut doc_failures = 0u32;
    for file in &files {
        info!("processing: {}", file.display());
        match localize::localize_file(file, &options, &fetcher, &cache) {
            Ok(counts) => totals.absorb(counts),
            Err(e) => {
                doc_failures += 1;
                error!("{}: {e}", file.display());
            }
        }
    }

    eprintln!(
        "{} succeeded, {} failed, {} skipped",
        totals.succeeded, totals.failed, totals.skipped
    );
    if doc_failures > 0 {
        eprintln!("{doc_failures} files could not be processed");
    }
    Ok(())
}

/// Move or delete every image in each document's asset directory that the
/// document no longer references.
///
/// # Errors
///
/// Returns errors from config loading or discovery. Per-file prune
/// failures are collected and reported, never fatal.
pub fn prune(
    path: &Path,
    image_dir: Option<String>,
    backup_dir: Option<String>,
    delete: bool,
) -> Result<(), Error> {
    let config = Config::load(Path::new("."))?;
    let files = scanner::discover(path, &config)?;
    let image_dir = image_dir.unwrap_or_else(|| config.image_dir.clone());
    let mode = if delete {
        PruneMode::Delete
    } else {
        PruneMode::Backup(PathBuf::from(
            backup_dir.unwrap_or_else(|| config.backup_dir.clone()),
        ))
    };

    let extractor = Extractor::new();
    let mut handled = 0usize;
    let mut failed = 0usize;
    for file in &files {
        let asset_dir = localize::asset_dir_for(file, &image_dir);
        if !asset_dir.is_dir() {
            warn!("no asset directory for {}, skipping", file.display());
            continue;
        }
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                error!("{}: {e}", file.display());
                continue;
            }
        };

        let extraction = extractor.extract(&text);
        let referenced = reconcile::referenced_assets(&extraction, resolve::document_dir(file));
        let plan = reconcile::plan(&referenced, &asset_dir);
        if plan.unused.is_empty() {
            info!("{}: no unused images", file.display());
            continue;
        }

        let outcome = reconcile::apply(&plan, &mode);
        for pruned in &outcome.handled {
            println!("PRUNED   {}", pruned.display());
        }
        for (failure, reason) in &outcome.failures {
            println!("FAILED   {}: {reason}", failure.display());
        }
        handled += outcome.handled.len();
        failed += outcome.failures.len();
    }

    eprintln!("{handled} unused images handled, {failed} failures");
    Ok(())
}

/// Count image references per document, as a table or JSON.
///
/// # Errors
///
/// Returns errors from config loading, discovery, or JSON serialization.
pub fn stats(path: &Path, json: bool) -> Result<(), Error> {
    let config = Config::load(Path::new("."))?;
    let files = scanner::discover(path, &config)?;
    let extractor = Extractor::new();

    let mut report: BTreeMap<String, DocumentStats> = BTreeMap::new();
    let mut totals = DocumentStats::default();
    for file in &files {
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                error!("{}: {e}", file.display());
                continue;
            }
        };
        let extraction = extractor.extract(&text);
        let doc_stats = crate::stats::collect(&extraction, resolve::document_dir(file));
        totals.absorb(doc_stats);
        report.insert(file.display().to_string(), doc_stats);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{:<48} {:>7} {:>7} {:>7} {:>7}",
            "file", "local", "remote", "inline", "html"
        );
        for (file, s) in &report {
            println!(
                "{file:<48} {:>7} {:>7} {:>7} {:>7}",
                s.local, s.remote, s.inline_encoded, s.html_tags
            );
        }
        println!();
        let total = totals.total();
        let count = report.len();
        println!("total: {total} references in {count} files");
    }
    Ok(())
}

/// Convert image references to zoom-styled `<img>` tags in place.
///
/// # Errors
///
/// Returns errors from config loading or discovery. A span-corrupt
/// document is logged and left untouched; the batch continues.
pub fn zoom(path: &Path, factor: u32) -> Result<(), Error> {
    let config = Config::load(Path::new("."))?;
    let files = scanner::discover(path, &config)?;
    let extractor = Extractor::new();
    let zoomer = Zoomer::new(factor);

    let mut updated = 0usize;
    for file in &files {
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                error!("{}: {e}", file.display());
                continue;
            }
        };
        let extraction = extractor.extract(&text);
        match zoomer.zoom_document(&text, &extraction) {
            Ok(new_text) if new_text == text => {}
            Ok(new_text) => match std::fs::write(file, new_text) {
                Ok(()) => {
                    updated += 1;
                    info!("updated: {}", file.display());
                }
                Err(e) => error!("{}: {e}", file.display()),
            },
            Err(e) => error!("{}: {e}", file.display()),
        }
    }

    eprintln!("{updated} files updated");
    Ok(())
}
