/// Core domain types for image references, resolved targets, and rewrite decisions.
use std::ops::Range;
use std::path::PathBuf;

/// One attribute of an HTML `<img>` tag, preserved in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlAttribute {
    /// Attribute name as written, e.g. `width` or `style`.
    pub name: String,
    /// Attribute value with the surrounding quotes removed.
    pub value: String,
}

/// The syntactic form an image reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceForm {
    /// `![alt](target)` or `![alt](target "title")`.
    InlineMarkdown,
    /// An `<img ...>` element with a `src` attribute.
    HtmlTag,
    /// `![alt][key]`, resolved through the definition table.
    ShortcutReference,
    /// A line-anchored `[key]: target "title"` definition.
    ReferenceDefinition,
}

/// One recognized image reference in a document.
///
/// `span` is the exact byte range of the full reference in the source text
/// and anchors the rewrite. Spans from one extraction never overlap.
#[derive(Debug, Clone)]
pub struct ReferenceRecord {
    /// Descriptive text; empty when the form carries none.
    pub alt: String,
    /// For `HtmlTag` only: every attribute other than `src`, `alt`, and
    /// `title`, in source order. Empty for all other forms.
    pub attributes: Vec<HtmlAttribute>,
    /// The syntactic form this reference was written in.
    pub form: ReferenceForm,
    /// The target exactly as written: URL, path, payload, or reference key.
    pub raw_target: String,
    /// Byte range of the full reference in the document text.
    pub span: Range<usize>,
    /// Optional title; empty when absent.
    pub title: String,
}

/// A `[key]: target "title"` side-table entry. Keys are stored lower-cased
/// and trimmed; a shortcut reference with no matching entry stays untouched.
#[derive(Debug, Clone)]
pub struct Definition {
    /// The definition's target exactly as written.
    pub target: String,
    /// Optional quoted title; empty when absent.
    pub title: String,
}

/// Classification of a reference target after percent-decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A `data:image` payload embedded in the document.
    InlineEncoded,
    /// An absolute filesystem path.
    LocalAbsolute,
    /// A path resolved against the document's own directory.
    LocalRelative,
    /// An `http` or `https` URL.
    Remote,
    /// Empty target or a shortcut key with no definition.
    Unresolvable,
}

/// Canonical, comparison-safe location of a resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalLocation {
    /// The inline payload itself, percent-decoded.
    InlinePayload(String),
    /// Normalized absolute filesystem path.
    LocalPath(PathBuf),
    /// Nothing to locate — the target could not be classified.
    None,
    /// The decoded target URL.
    RemoteUrl(String),
}

/// Output of resolving one reference target.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Where the target canonically lives.
    pub canonical: CanonicalLocation,
    /// Whether percent-decoding changed the raw target. Informational only;
    /// decoding is always attempted and is a no-op on plain strings.
    pub decode_applied: bool,
    /// The target's classification.
    pub kind: TargetKind,
}

/// Per-record outcome fed back into the rewrite engine.
#[derive(Debug, Clone)]
pub enum RewriteDecision {
    /// Splice this text over the record's span.
    Replace(String),
    /// Leave the record's span exactly as it was.
    Unchanged,
}

/// Counters reported at the end of a document rewrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunCounts {
    /// Records whose download, copy, or rewrite failed.
    pub failed: u32,
    /// Records left untouched: already local, inline payloads, unresolvable.
    pub skipped: u32,
    /// Records successfully localized and rewritten.
    pub succeeded: u32,
}

impl RunCounts {
    /// Fold another document's counters into this one.
    pub fn absorb(&mut self, other: RunCounts) {
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.succeeded += other.succeeded;
    }
}
