//! Reference extraction: recognizes the four image reference forms in raw
//! document text and yields span-anchored records.
//!
//! Extraction is two-pass: definitions are harvested over the whole document
//! first, so the side table is complete before any shortcut reference is
//! looked up. Malformed or partial syntax is never an error — it simply
//! stays plain text. `<img>` tags must be single-line; a tag whose closing
//! `>` sits on a later line is not recognized.

use std::collections::HashMap;

use regex::Regex;

use crate::types::{Definition, HtmlAttribute, ReferenceForm, ReferenceRecord};

/// The ordered output of one extraction pass over a document snapshot.
pub struct Extraction {
    /// Shortcut definition table, keyed by lower-cased trimmed key.
    /// When a key is defined more than once the last definition wins.
    pub definitions: HashMap<String, Definition>,
    /// Records ordered by ascending span start. Spans never overlap.
    pub records: Vec<ReferenceRecord>,
}

impl Extraction {
    /// The target and title a record actually points at. Inline, HTML, and
    /// definition records carry their own; shortcut records are looked up in
    /// the definition table. `None` means the shortcut key has no definition
    /// and the record must be left untouched.
    pub fn effective_target(&self, record: &ReferenceRecord) -> Option<(String, String)> {
        if record.form == ReferenceForm::ShortcutReference {
            let key = record.raw_target.trim().to_lowercase();
            return self
                .definitions
                .get(&key)
                .map(|d| (d.target.clone(), d.title.clone()));
        }
        Some((record.raw_target.clone(), record.title.clone()))
    }
}

/// Compiled patterns for the four reference forms.
pub struct Extractor {
    attribute: Regex,
    definition: Regex,
    html_tag: Regex,
    inline: Regex,
    shortcut: Regex,
}

impl Extractor {
    /// Compile the extraction patterns.
    ///
    /// # Panics
    ///
    /// Panics if a hardcoded pattern is invalid (compile-time invariant).
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            attribute: Regex::new(
                r#"([a-zA-Z][a-zA-Z0-9_:-]*)\s*=\s*(?:"([^"\n]*)"|'([^'\n]*)')"#,
            )
            .expect("valid regex"),
            definition: Regex::new(r#"(?m)^[ \t]*\[([^\]\n]+)\]:[ \t]*(\S+)(?:[ \t]+"([^"\n]*)")?[ \t]*$"#)
                .expect("valid regex"),
            html_tag: Regex::new(r"<img[ \t][^>\n]*>").expect("valid regex"),
            inline: Regex::new(r#"!\[([^\]\n]*)\]\(([^)\s]*)(?:[ \t]+"([^"\n]*)")?\)"#)
                .expect("valid regex"),
            shortcut: Regex::new(r"!\[([^\]\n]*)\]\[([^\]\n]*)\]").expect("valid regex"),
        }
    }

    /// Extract every recognizable reference from a document snapshot.
    ///
    /// Pass one harvests the definition table; pass two collects records of
    /// all four forms. Candidates whose span overlaps an earlier-starting
    /// record are dropped, so the returned spans are strictly disjoint.
    pub fn extract(&self, text: &str) -> Extraction {
        let definitions = self.harvest_definitions(text);

        let mut records = Vec::new();
        self.collect_inline(text, &mut records);
        self.collect_html_tags(text, &mut records);
        self.collect_shortcuts(text, &mut records);
        self.collect_definition_records(text, &mut records);

        // Earliest start wins; at equal starts the longer match wins. Any
        // candidate overlapping an accepted record is plain text to us.
        records.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(b.span.end.cmp(&a.span.end))
        });
        let mut kept: Vec<ReferenceRecord> = Vec::with_capacity(records.len());
        let mut last_end = 0usize;
        for record in records {
            if record.span.start >= last_end {
                last_end = record.span.end;
                kept.push(record);
            }
        }

        Extraction {
            definitions,
            records: kept,
        }
    }

    /// First pass: collect `[key]: target "title"` lines into the side table.
    fn harvest_definitions(&self, text: &str) -> HashMap<String, Definition> {
        let mut definitions = HashMap::new();
        for cap in self.definition.captures_iter(text) {
            let key = cap[1].trim().to_lowercase();
            definitions.insert(
                key,
                Definition {
                    target: cap[2].to_string(),
                    title: cap.get(3).map_or_else(String::new, |m| m.as_str().to_string()),
                },
            );
        }
        definitions
    }

    /// Collect `![alt](target "title")` records.
    fn collect_inline(&self, text: &str, records: &mut Vec<ReferenceRecord>) {
        for cap in self.inline.captures_iter(text) {
            let whole = cap.get(0).map(|m| m.range());
            let Some(span) = whole else { continue };
            records.push(ReferenceRecord {
                alt: cap[1].to_string(),
                attributes: Vec::new(),
                form: ReferenceForm::InlineMarkdown,
                raw_target: cap[2].to_string(),
                span,
                title: cap.get(3).map_or_else(String::new, |m| m.as_str().to_string()),
            });
        }
    }

    /// Collect single-line `<img ...>` records. The tag's attribute list is
    /// sub-scanned so `src` extraction does not depend on attribute order;
    /// a tag without a `src` attribute is not a reference.
    fn collect_html_tags(&self, text: &str, records: &mut Vec<ReferenceRecord>) {
        for tag in self.html_tag.find_iter(text) {
            let mut src = None;
            let mut alt = String::new();
            let mut title = String::new();
            let mut attributes = Vec::new();

            for cap in self.attribute.captures_iter(tag.as_str()) {
                let name = cap[1].to_string();
                let value = cap
                    .get(2)
                    .or_else(|| cap.get(3))
                    .map_or_else(String::new, |m| m.as_str().to_string());
                match name.as_str() {
                    "src" => {
                        if src.is_none() {
                            src = Some(value);
                        }
                    }
                    "alt" => alt = value,
                    "title" => title = value,
                    _ => attributes.push(HtmlAttribute { name, value }),
                }
            }

            let Some(raw_target) = src else { continue };
            records.push(ReferenceRecord {
                alt,
                attributes,
                form: ReferenceForm::HtmlTag,
                raw_target,
                span: tag.range(),
                title,
            });
        }
    }

    /// Collect `![alt][key]` records. The key stays raw here; lookup happens
    /// at resolution time against the harvested definition table.
    fn collect_shortcuts(&self, text: &str, records: &mut Vec<ReferenceRecord>) {
        for cap in self.shortcut.captures_iter(text) {
            let Some(whole) = cap.get(0) else { continue };
            records.push(ReferenceRecord {
                alt: cap[1].to_string(),
                attributes: Vec::new(),
                form: ReferenceForm::ShortcutReference,
                raw_target: cap[2].to_string(),
                span: whole.range(),
                title: String::new(),
            });
        }
    }

    /// Collect the definition lines themselves as records, so validation can
    /// reach targets that are only referenced through shortcuts.
    fn collect_definition_records(&self, text: &str, records: &mut Vec<ReferenceRecord>) {
        for cap in self.definition.captures_iter(text) {
            let Some(whole) = cap.get(0) else { continue };
            records.push(ReferenceRecord {
                alt: String::new(),
                attributes: Vec::new(),
                form: ReferenceForm::ReferenceDefinition,
                raw_target: cap[2].to_string(),
                span: whole.range(),
                title: cap.get(3).map_or_else(String::new, |m| m.as_str().to_string()),
            });
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Extraction {
        Extractor::new().extract(text)
    }

    #[test]
    fn inline_with_title() {
        let out = extract(r#"before ![a chart](img/chart.png "The Chart") after"#);
        assert_eq!(out.records.len(), 1);
        let rec = &out.records[0];
        assert_eq!(rec.form, ReferenceForm::InlineMarkdown);
        assert_eq!(rec.alt, "a chart");
        assert_eq!(rec.raw_target, "img/chart.png");
        assert_eq!(rec.title, "The Chart");
    }

    #[test]
    fn inline_without_title() {
        let out = extract("![x](a.png)");
        assert_eq!(out.records[0].raw_target, "a.png");
        assert_eq!(out.records[0].title, "");
        assert_eq!(out.records[0].span, 0..11);
    }

    #[test]
    fn inline_with_space_in_target_is_plain_text() {
        let out = extract("![x](my dir/a.png)");
        assert!(out.records.is_empty());
    }

    #[test]
    fn html_src_independent_of_attribute_order() {
        let out = extract(r#"<img width="200" src="./y.png" alt="pic">"#);
        assert_eq!(out.records.len(), 1);
        let rec = &out.records[0];
        assert_eq!(rec.form, ReferenceForm::HtmlTag);
        assert_eq!(rec.raw_target, "./y.png");
        assert_eq!(rec.alt, "pic");
        assert_eq!(rec.attributes.len(), 1);
        assert_eq!(rec.attributes[0].name, "width");
        assert_eq!(rec.attributes[0].value, "200");
    }

    #[test]
    fn html_single_quoted_src() {
        let out = extract("<img src='a.png'>");
        assert_eq!(out.records[0].raw_target, "a.png");
    }

    #[test]
    fn html_without_src_is_plain_text() {
        let out = extract(r#"<img alt="no source">"#);
        assert!(out.records.is_empty());
    }

    #[test]
    fn html_tag_spanning_lines_is_plain_text() {
        let out = extract("<img\n  src=\"a.png\">");
        assert!(out.records.is_empty());
    }

    #[test]
    fn shortcut_and_definition() {
        let text = "![logo][Home]\n\n[home]: img/logo.png \"Site\"\n";
        let out = extract(text);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].form, ReferenceForm::ShortcutReference);
        assert_eq!(out.records[1].form, ReferenceForm::ReferenceDefinition);

        // Lookup is case-insensitive and trimmed.
        let (target, title) = out.effective_target(&out.records[0]).unwrap();
        assert_eq!(target, "img/logo.png");
        assert_eq!(title, "Site");
    }

    #[test]
    fn shortcut_without_definition_is_unresolvable() {
        let out = extract("![a][nowhere]");
        assert_eq!(out.records.len(), 1);
        assert!(out.effective_target(&out.records[0]).is_none());
    }

    #[test]
    fn last_definition_wins() {
        let text = "[k]: first.png\n[k]: second.png\n";
        let out = extract(text);
        assert_eq!(out.definitions["k"].target, "second.png");
    }

    #[test]
    fn spans_are_disjoint_and_ascending() {
        let text = r#"![a](one.png) middle <img src="two.png" alt="![b](fake.png)"> ![c][k]"#;
        let out = extract(text);
        let mut last_end = 0;
        for rec in &out.records {
            assert!(rec.span.start >= last_end, "overlapping spans");
            last_end = rec.span.end;
        }
        // The markdown-looking alt text inside the tag must not yield a record.
        assert_eq!(out.records.len(), 3);
    }

    #[test]
    fn no_forms_no_records() {
        let out = extract("just prose, [a link](not-an-image) stays a link to us\n");
        // A plain link has no `!` and is not extracted.
        assert!(out.records.is_empty());
    }
}
