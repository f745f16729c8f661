//! Body text cleaning.
//!
//! Serializes a document subtree to plain text while dropping the noise
//! the structuring service leaves behind: citation-marker nodes, nested
//! headings that would leak subsection titles into body text, bracketed
//! numeric citation runs, bare page numbers, and leading bullet or pipe
//! glyphs. The tree itself is never touched.

use lazy_static::lazy_static;
use regex::Regex;

use crate::tree::{NodeId, Tei};
use crate::util::{norm_ws, push_deduped};

lazy_static! {
    /// Bracketed numeric citation runs: [1], [1-3], [2, 5-7, 9].
    static ref CITATION_RUN: Regex = Regex::new(
        r"\[(?:\s*\d+(?:\s*[-\u{2013}]\s*\d+)?\s*(?:,\s*\d+(?:\s*[-\u{2013}]\s*\d+)?)*)\]"
    )
    .unwrap();
    /// A line holding nothing but digits is a page-number artifact.
    static ref BARE_NUMBER_LINE: Regex = Regex::new(r"(?m)^\s*\d+\s*$").unwrap();
    /// Leading pipe/bullet glyphs left over from table-of-contents runs.
    static ref LEADING_GLYPH: Regex = Regex::new(r"(?m)^[|•]\s*").unwrap();
}

/// True for nodes that must not contribute to cleaned body text:
/// bibliographic citation markers and nested headings.
fn is_noise(doc: &Tei, id: NodeId) -> bool {
    match doc.name(id) {
        Some("ref") => doc.attr(id, "type") == Some("bibr"),
        Some("head") => true,
        _ => false,
    }
}

/// Clean one subtree into paragraph-joined text.
///
/// Paragraph-like nodes (`p`, `ab`) are serialized individually and
/// joined with blank lines, collapsing consecutive duplicates; a subtree
/// without any paragraph nodes falls back to its whole filtered text.
pub fn clean_subtree(doc: &Tei, id: NodeId) -> String {
    let mut parts: Vec<String> = Vec::new();
    for node in doc.descendants(id) {
        match doc.name(node) {
            Some("p") | Some("ab") => {
                let text = doc.text_filtered(node, &is_noise);
                push_deduped(&mut parts, scrub_text(&text));
            }
            _ => {}
        }
    }
    if parts.is_empty() {
        let text = doc.text_filtered(id, &is_noise);
        return scrub_text(&text);
    }
    parts.join("\n\n")
}

/// Pure string-level scrub, idempotent: `scrub_text(scrub_text(x)) ==
/// scrub_text(x)`.
pub fn scrub_text(text: &str) -> String {
    let s = CITATION_RUN.replace_all(text, "");
    let s = BARE_NUMBER_LINE.replace_all(&s, "");
    let s = LEADING_GLYPH.replace_all(&s, "");
    s.lines()
        .map(norm_ws)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
