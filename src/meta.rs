//! Header metadata extraction.
//!
//! Everything here reads from `teiHeader` only. Body-derived content
//! (abstract text, sections, media) is handled by the extractor.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::refs::norm_doi;
use crate::tree::{NodeId, Tei};
use crate::util::norm_ws;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Author {
    pub given: Option<String>,
    pub family: Option<String>,
    pub full: Option<String>,
    pub affiliations: Vec<String>,
}

/// High-level document metadata.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Meta {
    pub title: Option<String>,
    pub journal: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
    pub doi: Option<String>,
    pub keywords: Vec<String>,
    pub authors: Vec<Author>,
}

lazy_static! {
    static ref SPACE_BEFORE_SEP: Regex = Regex::new(r"\s+([,;])").unwrap();
    static ref SEP_NO_SPACE: Regex = Regex::new(r"([,;])(\S)").unwrap();
    static ref LEADING_MARKER: Regex = Regex::new(r"^\d+\s+").unwrap();
}

/// Extract metadata from the document header.
pub fn extract_meta(doc: &Tei) -> Meta {
    let Some(header) = doc.first_named(NodeId::ROOT, "teiHeader") else {
        return Meta::default();
    };

    let title = doc
        .first_named(header, "titleStmt")
        .and_then(|stmt| doc.child_named(stmt, "title"))
        .map(|t| doc.text(t))
        .filter(|t| !t.is_empty());

    let source = doc.first_named(header, "sourceDesc");
    let monogr = source.and_then(|s| doc.first_named(s, "monogr"));

    let journal = monogr
        .and_then(|m| doc.child_named(m, "title"))
        .map(|t| doc.text(t))
        .filter(|t| !t.is_empty());

    let publication = doc.first_named(header, "publicationStmt");
    let publisher = publication
        .and_then(|p| doc.first_named(p, "publisher"))
        .map(|p| doc.text(p))
        .filter(|p| !p.is_empty());

    // Explicit publication date first, imprint date otherwise
    let date = publication
        .and_then(|p| {
            doc.descendants_named(p, "date")
                .find(|&d| doc.attr(d, "type") == Some("published"))
        })
        .or_else(|| {
            monogr
                .and_then(|m| doc.first_named(m, "imprint"))
                .and_then(|i| doc.first_named(i, "date"))
        })
        .and_then(|d| {
            doc.attr(d, "when")
                .map(str::to_string)
                .or_else(|| Some(doc.text(d)))
                .filter(|s| !s.is_empty())
        });

    let doi = doc
        .descendants_named(header, "idno")
        .find(|&i| doc.attr(i, "type") == Some("DOI"))
        .and_then(|i| norm_doi(&doc.text(i)));

    let mut keywords = Vec::new();
    if let Some(kw) = doc.first_named(header, "keywords") {
        for term in doc.descendants_named(kw, "term") {
            let t = doc.text(term);
            if !t.is_empty() {
                keywords.push(t);
            }
        }
    }

    let authors = extract_authors(doc, source);

    Meta { title, journal, publisher, date, doi, keywords, authors }
}

/// Document authors from the source description, article-level first
/// with container-level as fallback, deduplicated by name.
fn extract_authors(doc: &Tei, source: Option<NodeId>) -> Vec<Author> {
    let Some(source) = source else {
        return Vec::new();
    };
    let mut authors: Vec<Author> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for scope_name in ["analytic", "monogr"] {
        for scope in doc.descendants_named(source, scope_name) {
            for node in doc.descendants_named(scope, "author") {
                let Some(pers) = doc.first_named(node, "persName") else {
                    continue;
                };
                let given = doc
                    .first_named(pers, "forename")
                    .map(|f| doc.text(f))
                    .filter(|s| !s.is_empty());
                let family = doc
                    .first_named(pers, "surname")
                    .map(|f| doc.text(f))
                    .filter(|s| !s.is_empty());
                let full = Some(doc.text(pers)).filter(|s| !s.is_empty());
                if given.is_none() && family.is_none() && full.is_none() {
                    continue;
                }
                let key = format!(
                    "{}|{}|{}",
                    given.as_deref().unwrap_or(""),
                    family.as_deref().unwrap_or(""),
                    full.as_deref().unwrap_or("")
                );
                if seen.contains(&key) {
                    continue;
                }
                seen.push(key);

                let mut affiliations: Vec<String> = Vec::new();
                for aff in doc.children_named(node, "affiliation") {
                    let text = affiliation_string(doc, aff);
                    if !text.is_empty() && !affiliations.contains(&text) {
                        affiliations.push(text);
                    }
                }
                authors.push(Author { given, family, full, affiliations });
            }
        }
    }
    authors
}

/// One affiliation as a cleaned, comma-joined string.
///
/// The raw-affiliation note is preferred; otherwise the string is
/// assembled from the structured org/address fields.
fn affiliation_string(doc: &Tei, aff: NodeId) -> String {
    let raw = doc
        .children_named(aff, "note")
        .find(|&n| doc.attr(n, "type") == Some("raw_affiliation"))
        .map(|n| doc.text(n))
        .filter(|t| !t.is_empty());
    if let Some(raw) = raw {
        return clean_affiliation(&raw);
    }

    let mut parts: Vec<String> = Vec::new();
    for tag in ["orgName", "settlement", "region", "country"] {
        for sub in doc.descendants_named(aff, tag) {
            let t = doc.text(sub);
            if !t.is_empty() {
                parts.push(t);
            }
        }
    }
    if parts.is_empty() {
        parts.push(doc.text(aff));
    }
    clean_affiliation(&parts.join(", "))
}

fn clean_affiliation(s: &str) -> String {
    let s = norm_ws(s);
    let s = SPACE_BEFORE_SEP.replace_all(&s, "$1");
    let s = SEP_NO_SPACE.replace_all(&s, "$1 $2");
    let s = LEADING_MARKER.replace(s.trim(), "");
    let s = s.trim_end_matches([';', ',']);

    // Drop repeated comma-separated components, case-insensitively
    let mut seen: Vec<String> = Vec::new();
    let mut parts: Vec<&str> = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let key = part.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            parts.push(part);
        }
    }
    parts.join(", ")
}
