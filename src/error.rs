/// Crate-level error types for mdimg.
use std::path::PathBuf;

/// All errors carry enough context to produce a useful diagnostic without
/// a debugger. Per-record failures (a single fetch, a single backup move)
/// are not errors — they are collected as data and reported at the end of
/// a run. These variants are the conditions that stop a document or a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A remote fetch or existence check failed: timeout, non-2xx, transport.
    #[error("fetch failed: {url}: {reason}")]
    Fetch {
        /// Description of the failure.
        reason: String,
        /// The URL that could not be fetched.
        url: String,
    },

    /// The HTTP client could not be constructed (bad proxy URL, TLS setup).
    #[error("http client: {reason}")]
    HttpClient {
        /// Description of the construction failure.
        reason: String,
    },

    /// The top-level input path is neither a markdown file nor a directory.
    #[error("not a markdown file or directory: {}", path.display())]
    InvalidInput {
        /// The path given on the command line.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// Two rewrite spans overlap. This is a corruption signal from the
    /// rewrite engine: the document's rewrite is aborted and the file on
    /// disk is left untouched.
    #[error("overlapping rewrite spans: span at byte {next_start} begins before previous span ends at byte {prev_end}")]
    SpanOverlap {
        /// Start offset of the overlapping span.
        next_start: usize,
        /// End offset of the span it collides with.
        prev_end: usize,
    },

    /// TOML deserialization of the config file failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
