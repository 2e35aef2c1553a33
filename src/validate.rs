//! Reference validation: every image reference in a document is resolved
//! and probed for reachability. Remote checks run on the worker pool;
//! verdicts are cached per canonical location for the rest of the run.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::debug;

use crate::cache::RunCache;
use crate::error::Error;
use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::resolve;
use crate::types::{CanonicalLocation, TargetKind};

/// One unreachable or malformed reference, reported per document.
#[derive(Debug, serde::Serialize)]
pub struct InvalidRef {
    /// The target exactly as written in the document.
    pub raw_target: String,
    /// Why the reference is considered invalid.
    pub reason: String,
}

/// Why a record needs no further probing, or how to probe it.
enum Probe {
    /// Already known invalid with this reason.
    Invalid(String),
    /// Local path to test for existence.
    Local(String),
    /// Remote URL to test on the worker pool.
    Remote(String),
    /// Valid without probing (structurally sound inline payload).
    Valid,
}

/// Validate every reference in one document. Returns the invalid ones in
/// document order; an empty list means the document is clean.
///
/// # Errors
///
/// Returns `Error::Io` if the document cannot be read.
pub fn validate_document(
    doc: &Path,
    fetcher: &dyn Fetcher,
    cache: &RunCache,
    workers: usize,
) -> Result<Vec<InvalidRef>, Error> {
    let text = std::fs::read_to_string(doc)?;
    let extraction = Extractor::new().extract(&text);
    let doc_dir = resolve::document_dir(doc);

    let probes: Vec<Probe> = extraction
        .records
        .iter()
        .map(|record| {
            let Some((target, _)) = extraction.effective_target(record) else {
                return Probe::Invalid(format!(
                    "no definition for reference key `{}`",
                    record.raw_target.trim()
                ));
            };
            let resolved = resolve::classify(&target, doc_dir);
            match (resolved.kind, resolved.canonical) {
                (TargetKind::Unresolvable, _) => Probe::Invalid("empty target".to_string()),
                (TargetKind::InlineEncoded, CanonicalLocation::InlinePayload(payload)) => {
                    if inline_payload_is_valid(&payload) {
                        Probe::Valid
                    } else {
                        Probe::Invalid("undecodable inline payload".to_string())
                    }
                }
                (TargetKind::Remote, CanonicalLocation::RemoteUrl(url)) => Probe::Remote(url),
                (_, CanonicalLocation::LocalPath(path)) => {
                    Probe::Local(path.to_string_lossy().into_owned())
                }
                _ => Probe::Invalid("unclassifiable target".to_string()),
            }
        })
        .collect();

    let remote_verdicts = probe_remote_targets(&probes, fetcher, cache, workers);

    let mut invalid = Vec::new();
    for (index, probe) in probes.iter().enumerate() {
        let Some(record) = extraction.records.get(index) else {
            continue;
        };
        let reason = match probe {
            Probe::Valid => None,
            Probe::Invalid(reason) => Some(reason.clone()),
            Probe::Local(path) => {
                if local_exists(path, cache) {
                    None
                } else {
                    Some(format!("file not found: {path}"))
                }
            }
            Probe::Remote(url) => {
                if remote_verdicts.get(&index).copied().unwrap_or(false) {
                    None
                } else {
                    Some(format!("unreachable: {url}"))
                }
            }
        };
        if let Some(reason) = reason {
            debug!("{}: {} ({reason})", doc.display(), record.raw_target);
            invalid.push(InvalidRef {
                raw_target: record.raw_target.clone(),
                reason,
            });
        }
    }
    Ok(invalid)
}

/// Existence check for a canonical local path, memoized in the run cache.
fn local_exists(path: &str, cache: &RunCache) -> bool {
    if let Some(verdict) = cache.verdict(path) {
        return verdict;
    }
    let verdict = Path::new(path).exists();
    cache.record_verdict(path, verdict);
    verdict
}

/// Probe all remote targets on a bounded worker pool. A timeout or
/// transport failure is a `false` verdict for that record only; siblings
/// keep running.
fn probe_remote_targets(
    probes: &[Probe],
    fetcher: &dyn Fetcher,
    cache: &RunCache,
    workers: usize,
) -> HashMap<usize, bool> {
    let jobs: Vec<(usize, &str)> = probes
        .iter()
        .enumerate()
        .filter_map(|(index, probe)| match probe {
            Probe::Remote(url) => Some((index, url.as_str())),
            _ => None,
        })
        .collect();
    if jobs.is_empty() {
        return HashMap::new();
    }

    let worker_count = workers.clamp(1, jobs.len());
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, &str)>();
    let (verdict_tx, verdict_rx) = crossbeam_channel::unbounded::<(usize, bool)>();
    for job in jobs {
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let verdict_tx = verdict_tx.clone();
            scope.spawn(move || {
                while let Ok((index, url)) = job_rx.recv() {
                    let verdict = match cache.verdict(url) {
                        Some(cached) => cached,
                        None => {
                            let live = fetcher.exists(url);
                            cache.record_verdict(url, live);
                            live
                        }
                    };
                    let _ = verdict_tx.send((index, verdict));
                }
            });
        }
    });
    drop(verdict_tx);

    verdict_rx.try_iter().collect()
}

/// Structural validation of an inline payload: the part after the
/// `base64,` marker must decode. A payload without the marker is invalid.
fn inline_payload_is_valid(payload: &str) -> bool {
    let Some((_, data)) = payload.split_once("base64,") else {
        return false;
    };
    STANDARD.decode(data.trim()).is_ok()
}
