//! The rewrite engine: splices per-record decisions back into document text.
//!
//! Replacements are anchored on record spans, never on substring search —
//! the same reference text can occur verbatim twice with different
//! resolutions, and a search-and-replace would rewrite the wrong one.
//! Overlapping spans mean the record set is corrupt; the engine refuses to
//! produce output for that document rather than guess.

use std::ops::Range;

use regex::Regex;

use crate::error::Error;
use crate::types::{ReferenceRecord, RewriteDecision};

/// Apply one decision per record to the original text, in a single
/// left-to-right pass. Text outside record spans is carried over
/// byte-for-byte; a document whose decisions are all `Unchanged` comes
/// back identical to its input.
///
/// # Errors
///
/// Returns `Error::SpanOverlap` if any two replacement spans overlap or a
/// span falls outside the document — both are corruption, not recoverable
/// conditions.
pub fn apply(
    original: &str,
    records: &[ReferenceRecord],
    decisions: &[RewriteDecision],
) -> Result<String, Error> {
    let mut edits: Vec<(&Range<usize>, &str)> = records
        .iter()
        .zip(decisions)
        .filter_map(|(record, decision)| match decision {
            RewriteDecision::Replace(text) => Some((&record.span, text.as_str())),
            RewriteDecision::Unchanged => None,
        })
        .collect();
    edits.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(original.len());
    let mut cursor = 0usize;
    for (span, replacement) in edits {
        if span.start < cursor {
            return Err(Error::SpanOverlap {
                next_start: span.start,
                prev_end: cursor,
            });
        }
        // A span outside the document is the same corruption class as an
        // overlap: the records no longer describe this text.
        let Some(between) = original.get(cursor..span.start) else {
            return Err(Error::SpanOverlap {
                next_start: span.start,
                prev_end: cursor,
            });
        };
        if original.get(span.start..span.end).is_none() {
            return Err(Error::SpanOverlap {
                next_start: span.start,
                prev_end: cursor,
            });
        }
        out.push_str(between);
        out.push_str(replacement);
        cursor = span.end;
    }
    out.push_str(original.get(cursor..).unwrap_or(""));
    Ok(out)
}

/// Serialize a reference in the inline markdown form. Shortcut references
/// are rewritten to this form too, since their definitions stay where they
/// are. Alt and title are carried over verbatim.
pub fn render_inline(alt: &str, target: &str, title: &str) -> String {
    if title.is_empty() {
        format!("![{alt}]({target})")
    } else {
        format!("![{alt}]({target} \"{title}\")")
    }
}

/// Substitute only the `src` value inside an `<img>` tag's original text,
/// leaving every other attribute byte-for-byte where it was. Returns `None`
/// when the tag has no quoted `src` attribute.
///
/// # Panics
///
/// Panics if the hardcoded pattern is invalid (compile-time invariant).
#[allow(clippy::expect_used)]
pub fn replace_img_src(tag: &str, new_target: &str) -> Option<String> {
    // The leading whitespace keeps this off lookalikes such as `data-src`.
    let pattern =
        Regex::new(r#"\ssrc\s*=\s*(?:"([^"\n]*)"|'([^'\n]*)')"#).expect("valid regex");
    let caps = pattern.captures(tag)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    let mut out = String::with_capacity(tag.len() + new_target.len());
    out.push_str(&tag[..value.start()]);
    out.push_str(new_target);
    out.push_str(&tag[value.end()..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;

    #[test]
    fn all_unchanged_is_byte_identical() {
        let text = "intro ![a](x.png) outro\n";
        let extraction = Extractor::new().extract(text);
        let decisions = vec![RewriteDecision::Unchanged; extraction.records.len()];
        let out = apply(text, &extraction.records, &decisions).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn no_records_round_trips_exactly() {
        let text = "no images here, only prose\nand a second line\n";
        let out = apply(text, &[], &[]).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn identical_references_rewrite_independently() {
        // The same reference text twice; only the second gets replaced.
        let text = "![a](u.png) and ![a](u.png)";
        let extraction = Extractor::new().extract(text);
        assert_eq!(extraction.records.len(), 2);
        let decisions = vec![
            RewriteDecision::Unchanged,
            RewriteDecision::Replace("![a](local/u.png)".to_string()),
        ];
        let out = apply(text, &extraction.records, &decisions).unwrap();
        assert_eq!(out, "![a](u.png) and ![a](local/u.png)");
    }

    #[test]
    fn overlapping_spans_are_rejected() {
        let text = "![a](one.png)";
        let extraction = Extractor::new().extract(text);
        let mut records = extraction.records.clone();
        let mut second = records[0].clone();
        second.span = 5..20;
        records.push(second);
        let decisions = vec![
            RewriteDecision::Replace("x".to_string()),
            RewriteDecision::Replace("y".to_string()),
        ];
        assert!(matches!(
            apply(text, &records, &decisions),
            Err(Error::SpanOverlap { .. })
        ));
    }

    #[test]
    fn inline_serialization_keeps_title() {
        assert_eq!(render_inline("a", "out/x.png", "t"), "![a](out/x.png \"t\")");
        assert_eq!(render_inline("a", "out/x.png", ""), "![a](out/x.png)");
    }

    #[test]
    fn img_src_substitution_preserves_other_attributes() {
        let tag = r#"<img width="200" src="https://s/x.png" alt="p">"#;
        let out = replace_img_src(tag, "image/doc/x.png").unwrap();
        assert_eq!(out, r#"<img width="200" src="image/doc/x.png" alt="p">"#);
    }

    #[test]
    fn img_src_substitution_handles_single_quotes() {
        let out = replace_img_src("<img src='a.png'>", "b.png").unwrap();
        assert_eq!(out, "<img src='b.png'>");
    }
}
