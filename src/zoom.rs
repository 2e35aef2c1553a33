//! Zoom rewriting: inline references become `<img>` tags carrying a
//! `zoom` style declaration; existing tags get the declaration added or
//! replaced in place. Width and height attributes are stripped so they
//! don't fight the zoom factor.

use regex::Regex;

use crate::error::Error;
use crate::extract::Extraction;
use crate::rewrite;
use crate::types::{HtmlAttribute, ReferenceForm, RewriteDecision};

/// Compiled patterns and the zoom factor for one run.
pub struct Zoomer {
    factor: u32,
    style_attr: Regex,
    width_height: Regex,
    zoom_decl: Regex,
}

impl Zoomer {
    /// Build a zoomer for the given percentage factor.
    ///
    /// # Panics
    ///
    /// Panics if a hardcoded pattern is invalid (compile-time invariant).
    #[allow(clippy::expect_used)]
    pub fn new(factor: u32) -> Self {
        Self {
            factor,
            style_attr: Regex::new(r#"(\s)style\s*=\s*(?:"([^"\n]*)"|'([^'\n]*)')"#)
                .expect("valid regex"),
            width_height: Regex::new(r#"\s+(?:width|height)\s*=\s*(?:"[^"\n]*"|'[^'\n]*')"#)
                .expect("valid regex"),
            zoom_decl: Regex::new(r"zoom:\s*\d+%;?").expect("valid regex"),
        }
    }

    /// Apply the zoom factor to every inline and HTML reference in a
    /// document. Shortcut references and definitions stay untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::SpanOverlap` if the rewrite engine detects span
    /// corruption.
    pub fn zoom_document(&self, text: &str, extraction: &Extraction) -> Result<String, Error> {
        let decisions: Vec<RewriteDecision> = extraction
            .records
            .iter()
            .map(|record| match record.form {
                ReferenceForm::InlineMarkdown => RewriteDecision::Replace(self.render_img_tag(
                    &record.alt,
                    &record.raw_target,
                    &record.title,
                )),
                ReferenceForm::HtmlTag => {
                    let tag = text.get(record.span.clone()).unwrap_or("");
                    RewriteDecision::Replace(self.restyle_tag(tag, &record.attributes))
                }
                ReferenceForm::ShortcutReference | ReferenceForm::ReferenceDefinition => {
                    RewriteDecision::Unchanged
                }
            })
            .collect();
        rewrite::apply(text, &extraction.records, &decisions)
    }

    /// Serialize an inline reference as a zoomed `<img>` tag.
    fn render_img_tag(&self, alt: &str, src: &str, title: &str) -> String {
        let factor = self.factor;
        if title.is_empty() {
            format!(r#"<img src="{src}" alt="{alt}" style="zoom:{factor}%;">"#)
        } else {
            format!(r#"<img src="{src}" alt="{alt}" title="{title}" style="zoom:{factor}%;">"#)
        }
    }

    /// Re-style an existing tag: replace an existing zoom declaration,
    /// append to an existing style attribute, or insert a new one before
    /// the closing bracket. Untouched attributes keep their order.
    fn restyle_tag(&self, tag: &str, attributes: &[HtmlAttribute]) -> String {
        let stripped = self.width_height.replace_all(tag, "").into_owned();
        let factor = self.factor;

        let has_zoom = attributes
            .iter()
            .any(|a| a.name == "style" && a.value.contains("zoom:"));
        if has_zoom {
            return self
                .zoom_decl
                .replace(&stripped, format!("zoom:{factor}%;"))
                .into_owned();
        }

        let has_style = attributes.iter().any(|a| a.name == "style");
        if has_style {
            return self
                .style_attr
                .replace(&stripped, |caps: &regex::Captures<'_>| {
                    let lead = caps.get(1).map_or(" ", |m| m.as_str());
                    let existing = caps
                        .get(2)
                        .or_else(|| caps.get(3))
                        .map_or("", |m| m.as_str());
                    format!(r#"{lead}style="{} zoom:{factor}%;""#, existing.trim_end())
                })
                .into_owned();
        }

        self.insert_style_attr(&stripped)
    }

    /// Add a fresh `style` attribute right before the tag's closing bracket.
    fn insert_style_attr(&self, tag: &str) -> String {
        let decl = format!(r#" style="zoom:{}%;""#, self.factor);
        if let Some(body) = tag.strip_suffix("/>") {
            format!("{}{decl}/>", body.trim_end())
        } else if let Some(body) = tag.strip_suffix('>') {
            format!("{}{decl}>", body.trim_end())
        } else {
            tag.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;

    fn zoom(text: &str, factor: u32) -> String {
        let extraction = Extractor::new().extract(text);
        Zoomer::new(factor).zoom_document(text, &extraction).unwrap()
    }

    #[test]
    fn inline_becomes_zoomed_tag() {
        let out = zoom("![a](pic.png \"t\")", 67);
        assert_eq!(
            out,
            r#"<img src="pic.png" alt="a" title="t" style="zoom:67%;">"#
        );
    }

    #[test]
    fn inline_without_title_omits_title_attr() {
        let out = zoom("![a](pic.png)", 67);
        assert_eq!(out, r#"<img src="pic.png" alt="a" style="zoom:67%;">"#);
    }

    #[test]
    fn width_is_stripped_and_style_inserted() {
        let out = zoom(r#"<img src="./y.png" width="200">"#, 50);
        assert_eq!(out, r#"<img src="./y.png" style="zoom:50%;">"#);
    }

    #[test]
    fn existing_style_gets_zoom_appended() {
        let out = zoom(r#"<img src="y.png" style="border:1px;">"#, 40);
        assert_eq!(out, r#"<img src="y.png" style="border:1px; zoom:40%;">"#);
    }

    #[test]
    fn existing_zoom_is_replaced_not_stacked() {
        let out = zoom(r#"<img src="y.png" style="zoom:80%;">"#, 40);
        assert_eq!(out, r#"<img src="y.png" style="zoom:40%;">"#);
    }

    #[test]
    fn zoom_is_idempotent_at_the_same_factor() {
        let once = zoom("![a](pic.png)", 50);
        let twice = zoom(&once, 50);
        assert_eq!(once, twice);
    }

    #[test]
    fn self_closing_tag_keeps_its_slash() {
        let out = zoom(r#"<img src="y.png" />"#, 30);
        assert_eq!(out, r#"<img src="y.png" style="zoom:30%;"/>"#);
    }

    #[test]
    fn shortcut_references_are_left_alone() {
        let text = "![a][k]\n\n[k]: pic.png\n";
        assert_eq!(zoom(text, 50), text);
    }
}
