//! Reference statistics: how each document introduces its images.
//! HTML tags are counted as their own bucket; everything else is bucketed
//! by the resolver's classification, so the numbers here never disagree
//! with what the other commands would do to the same document.

use std::path::Path;

use crate::extract::Extraction;
use crate::resolve;
use crate::types::{ReferenceForm, TargetKind};

/// Per-document reference counts.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct DocumentStats {
    /// References written as `<img>` tags, whatever they point at.
    pub html_tags: u32,
    /// Inline-encoded (`data:image`) payloads.
    pub inline_encoded: u32,
    /// References to files on disk.
    pub local: u32,
    /// References to `http`/`https` URLs.
    pub remote: u32,
}

impl DocumentStats {
    /// Sum of all buckets.
    pub fn total(&self) -> u32 {
        self.html_tags + self.inline_encoded + self.local + self.remote
    }

    /// Fold another document's counts into this one.
    pub fn absorb(&mut self, other: DocumentStats) {
        self.html_tags += other.html_tags;
        self.inline_encoded += other.inline_encoded;
        self.local += other.local;
        self.remote += other.remote;
    }
}

/// Count one document's references. Definitions are the plumbing behind
/// shortcut references, not renderable images, so they are not counted;
/// unresolvable records are not counted either.
pub fn collect(extraction: &Extraction, document_dir: &Path) -> DocumentStats {
    let mut stats = DocumentStats::default();
    for record in &extraction.records {
        if record.form == ReferenceForm::ReferenceDefinition {
            continue;
        }
        if record.form == ReferenceForm::HtmlTag {
            stats.html_tags += 1;
            continue;
        }
        let Some((target, _)) = extraction.effective_target(record) else {
            continue;
        };
        match resolve::classify(&target, document_dir).kind {
            TargetKind::InlineEncoded => stats.inline_encoded += 1,
            TargetKind::LocalAbsolute | TargetKind::LocalRelative => stats.local += 1,
            TargetKind::Remote => stats.remote += 1,
            TargetKind::Unresolvable => {}
        }
    }
    stats
}
