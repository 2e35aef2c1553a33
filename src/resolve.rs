//! Target resolution: percent-decoding, classification, and the single
//! path-canonicalization rule shared by every component that compares paths.
//!
//! Two textually different but semantically identical paths must compare
//! equal as set members, and the same rule must be applied to paths coming
//! out of documents and to paths coming off the filesystem. Any asymmetry
//! here turns into false-positive deletions in the reconciler, so all
//! comparable path keys are produced by [`canonical_key`] and nothing else.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::types::{CanonicalLocation, ResolvedTarget, TargetKind};

/// Prefix that marks an inline-encoded image payload, whatever syntactic
/// form carried it.
const INLINE_PAYLOAD_PREFIX: &str = "data:image";

/// Percent-decode a raw target. Decoding is attempted unconditionally —
/// a plain string decodes to itself — so callers never need an "is this
/// encoded" pre-check. Returns the decoded string and whether decoding
/// changed anything. Invalid UTF-8 after decoding falls back to the raw
/// input untouched.
pub fn percent_decode(raw: &str) -> (String, bool) {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => {
            let decoded = decoded.into_owned();
            let applied = decoded != raw;
            (decoded, applied)
        }
        Err(_) => (raw.to_string(), false),
    }
}

/// Collapse `.` and `..` segments without touching the filesystem.
/// A leading `..` with nothing left to pop is preserved; `..` directly
/// under the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(comp),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// The canonical, comparison-safe form of a filesystem path: absolute,
/// with `.`/`..` collapsed. Every set-membership comparison in the crate
/// goes through this one function.
pub fn canonical_key(path: &Path) -> PathBuf {
    match std::path::absolute(path) {
        Ok(abs) => normalize_path(&abs),
        Err(_) => normalize_path(path),
    }
}

/// The directory a document's relative references resolve against.
/// A bare filename like `doc.md` resolves against the working directory.
pub fn document_dir(doc: &Path) -> &Path {
    match doc.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Classify a raw target and compute its canonical location, resolving
/// local paths against the directory containing the document.
pub fn classify(raw_target: &str, document_dir: &Path) -> ResolvedTarget {
    let (decoded, decode_applied) = percent_decode(raw_target);

    if decoded.trim().is_empty() {
        return ResolvedTarget {
            canonical: CanonicalLocation::None,
            decode_applied,
            kind: TargetKind::Unresolvable,
        };
    }

    if decoded.starts_with(INLINE_PAYLOAD_PREFIX) {
        return ResolvedTarget {
            canonical: CanonicalLocation::InlinePayload(decoded),
            decode_applied,
            kind: TargetKind::InlineEncoded,
        };
    }

    if let Ok(parsed) = Url::parse(&decoded)
        && matches!(parsed.scheme(), "http" | "https")
    {
        return ResolvedTarget {
            canonical: CanonicalLocation::RemoteUrl(decoded),
            decode_applied,
            kind: TargetKind::Remote,
        };
    }

    // Markdown written on Windows may spell separators backwards.
    let unified = decoded.replace('\\', "/");
    let target_path = Path::new(&unified);
    if target_path.is_absolute() {
        return ResolvedTarget {
            canonical: CanonicalLocation::LocalPath(canonical_key(target_path)),
            decode_applied,
            kind: TargetKind::LocalAbsolute,
        };
    }

    ResolvedTarget {
        canonical: CanonicalLocation::LocalPath(canonical_key(&document_dir.join(target_path))),
        decode_applied,
        kind: TargetKind::LocalRelative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_classification() {
        let out = classify("https://x/y.png", Path::new("docs"));
        assert_eq!(out.kind, TargetKind::Remote);
        assert_eq!(
            out.canonical,
            CanonicalLocation::RemoteUrl("https://x/y.png".to_string())
        );
    }

    #[test]
    fn relative_classification() {
        let out = classify("./img/y.png", Path::new("docs"));
        assert_eq!(out.kind, TargetKind::LocalRelative);
        let CanonicalLocation::LocalPath(path) = &out.canonical else {
            panic!("expected a local path");
        };
        assert!(path.ends_with("docs/img/y.png"), "got {}", path.display());
        assert!(path.is_absolute());
    }

    #[test]
    fn absolute_classification() {
        let out = classify("/srv/img/y.png", Path::new("docs"));
        assert_eq!(out.kind, TargetKind::LocalAbsolute);
    }

    #[test]
    fn inline_payload_classification() {
        let out = classify("data:image/png;base64,AAAA", Path::new("docs"));
        assert_eq!(out.kind, TargetKind::InlineEncoded);
    }

    #[test]
    fn empty_target_is_unresolvable() {
        let out = classify("", Path::new("docs"));
        assert_eq!(out.kind, TargetKind::Unresolvable);
        assert_eq!(out.canonical, CanonicalLocation::None);
    }

    #[test]
    fn decode_does_not_change_resolution() {
        let plain = classify("img/a b.png", Path::new("docs"));
        let encoded = classify("img/a%20b.png", Path::new("docs"));
        assert_eq!(plain.canonical, encoded.canonical);
        assert!(!plain.decode_applied);
        assert!(encoded.decode_applied);
    }

    #[test]
    fn normalization_collapses_dots() {
        assert_eq!(
            normalize_path(Path::new("a/./b/../c/x.png")),
            PathBuf::from("a/c/x.png")
        );
        assert_eq!(normalize_path(Path::new("../up/x")), PathBuf::from("../up/x"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn dot_segments_compare_equal_after_canonicalization() {
        let a = canonical_key(Path::new("docs/img/../img/y.png"));
        let b = canonical_key(Path::new("docs/img/y.png"));
        assert_eq!(a, b);
    }

    #[test]
    fn windows_separators_are_unified() {
        let back = classify(r"img\sub\y.png", Path::new("docs"));
        let fwd = classify("img/sub/y.png", Path::new("docs"));
        assert_eq!(back.canonical, fwd.canonical);
    }
}
