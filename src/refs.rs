//! Reference extraction.
//!
//! Structured bibliography entries come straight from `listBibl`
//! records. When a document carries no structured bibliography at all,
//! the raw references text is segmented heuristically: each DOI token
//! closes the entry it belongs to, and DOI-free stretches are split
//! after year tokens so a whole bibliography never collapses into one
//! blob.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::clean::scrub_text;
use crate::mapping::{CanonicalKey, canonicalize};
use crate::tree::{NodeId, Tei};
use crate::util::{norm_ws, push_deduped};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefAuthor {
    pub given: Option<String>,
    pub family: Option<String>,
    pub full: Option<String>,
}

/// One bibliography entry, structured where the input allows it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceEntry {
    /// Original entry text; only set for heuristic entries.
    pub raw: Option<String>,
    pub authors: Vec<RefAuthor>,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub date: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub publisher: Option<String>,
    pub doi: Option<String>,
    pub provenance: &'static str,
}

lazy_static! {
    static ref DOI_TOKEN: Regex = Regex::new(r"10\.[0-9]{4,9}/\S+").unwrap();
    static ref DOI_PREFIX: Regex =
        Regex::new(r"(?i)^(doi:|https?://(dx\.)?doi\.org/)").unwrap();
    static ref YEAR_TOKEN: Regex = Regex::new(r"\b(?:19|20)\d{2}\b").unwrap();
}

/// Parse references, structured first with heuristic fallback.
pub fn parse_references(doc: &Tei) -> Vec<ReferenceEntry> {
    let structured = parse_structured(doc);
    if !structured.is_empty() {
        return structured;
    }
    let Some(raw) = raw_references_text(doc) else {
        return Vec::new();
    };
    let entries = parse_heuristic(&raw);
    debug!("heuristic reference fallback produced {} entries", entries.len());
    entries
}

/// Strip URL/label prefixes and trailing punctuation from a DOI.
pub fn norm_doi(s: &str) -> Option<String> {
    let x = DOI_PREFIX.replace(s.trim(), "");
    let x = x.trim_start_matches('/').trim_end_matches(['.', ',', ';']);
    (!x.is_empty()).then(|| x.to_string())
}

// ============================================================================
// Structured path
// ============================================================================

fn parse_structured(doc: &Tei) -> Vec<ReferenceEntry> {
    let mut seen: Vec<(String, String, String, String)> = Vec::new();
    let mut out = Vec::new();
    for list in doc.descendants_named(NodeId::ROOT, "listBibl") {
        for b in doc.descendants_named(list, "biblStruct") {
            let rec = parse_biblstruct(doc, b);
            let key = (
                rec.doi.as_deref().unwrap_or("").to_lowercase(),
                rec.title.as_deref().unwrap_or("").to_lowercase(),
                rec.journal.as_deref().unwrap_or("").to_lowercase(),
                rec.date.as_deref().unwrap_or("").to_lowercase(),
            );
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            out.push(rec);
        }
    }
    out
}

fn parse_biblstruct(doc: &Tei, b: NodeId) -> ReferenceEntry {
    let analytic = doc.first_named(b, "analytic");
    let monogr = doc.first_named(b, "monogr");

    // Article title when present, container title otherwise
    let analytic_title = analytic
        .and_then(|a| doc.first_named(a, "title"))
        .map(|t| doc.text(t))
        .filter(|t| !t.is_empty());
    let journal = monogr
        .and_then(|m| doc.first_named(m, "title"))
        .map(|t| doc.text(t))
        .filter(|t| !t.is_empty());
    let title = analytic_title.or_else(|| journal.clone());

    let imprint = monogr.and_then(|m| doc.first_named(m, "imprint"));
    let date = imprint.and_then(|i| doc.first_named(i, "date")).and_then(|d| {
        doc.attr(d, "when")
            .map(str::to_string)
            .or_else(|| Some(doc.text(d)))
            .filter(|s| !s.is_empty())
    });

    let doi = doc
        .descendants_named(b, "idno")
        .find(|&i| doc.attr(i, "type") == Some("DOI"))
        .and_then(|i| norm_doi(&doc.text(i)));

    let scope_value = |unit: &str| {
        imprint
            .and_then(|i| {
                doc.children_named(i, "biblScope")
                    .find(|&s| doc.attr(s, "unit") == Some(unit))
            })
            .and_then(|s| {
                doc.attr(s, "n")
                    .map(str::to_string)
                    .or_else(|| Some(doc.text(s)))
                    .filter(|v| !v.is_empty())
            })
    };
    let volume = scope_value("volume");
    let issue = scope_value("issue");
    let pages = scope_value("page").or_else(|| scope_value("pp"));

    let publisher = imprint
        .and_then(|i| doc.first_named(i, "publisher"))
        .map(|p| doc.text(p))
        .filter(|p| !p.is_empty());

    // Authors of the article itself when present, container authors
    // otherwise
    let mut authors = analytic.map(|a| person_names(doc, a)).unwrap_or_default();
    if authors.is_empty()
        && let Some(m) = monogr
    {
        authors = person_names(doc, m);
    }

    ReferenceEntry {
        raw: None,
        authors,
        title,
        journal,
        date,
        volume,
        issue,
        pages,
        publisher,
        doi,
        provenance: "structured",
    }
}

fn person_names(doc: &Tei, scope: NodeId) -> Vec<RefAuthor> {
    let mut authors = Vec::new();
    for author in doc.descendants_named(scope, "author") {
        let Some(pers) = doc.first_named(author, "persName") else {
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
        if given.is_some() || family.is_some() || full.is_some() {
            authors.push(RefAuthor { given, family, full });
        }
    }
    authors
}

// ============================================================================
// Heuristic fallback
// ============================================================================

/// Serialized text of the references division, if any. The typed div
/// wins; a div whose heading reads "References"/"Bibliography" is
/// accepted when no type attribute survived.
fn raw_references_text(doc: &Tei) -> Option<String> {
    let div = doc
        .descendants_named(NodeId::ROOT, "div")
        .find(|&d| doc.attr(d, "type") == Some("references"))
        .or_else(|| {
            doc.descendants_named(NodeId::ROOT, "div").find(|&d| {
                doc.child_named(d, "head").is_some_and(|h| {
                    matches!(
                        canonicalize(&doc.text(h)),
                        Some(CanonicalKey::NonContent("references" | "bibliography"))
                    )
                })
            })
        })?;
    let skip_heads = |doc: &Tei, id: NodeId| doc.name(id) == Some("head");
    let text = scrub_text(&doc.text_filtered(div, &skip_heads));
    (!text.is_empty()).then_some(text)
}

/// Segment raw bibliography text into entries.
///
/// Each DOI token ends the entry it closes, so text following a DOI
/// always starts a fresh entry. Whatever trails the last DOI (or the
/// whole text when no DOI appears) is split after year tokens.
fn parse_heuristic(raw: &str) -> Vec<ReferenceEntry> {
    let txt = norm_ws(raw);
    if txt.is_empty() {
        return Vec::new();
    }

    let mut segments: Vec<String> = Vec::new();
    let mut last = 0;
    for m in DOI_TOKEN.find_iter(&txt) {
        push_deduped(&mut segments, txt[last..m.end()].trim().to_string());
        last = m.end();
    }
    for chunk in split_after_years(txt[last..].trim()) {
        push_deduped(&mut segments, chunk);
    }

    segments
        .into_iter()
        .map(|raw| {
            let doi = DOI_TOKEN.find(&raw).and_then(|m| norm_doi(m.as_str()));
            let date = YEAR_TOKEN.find(&raw).map(|m| m.as_str().to_string());
            ReferenceEntry {
                raw: Some(raw),
                doi,
                date,
                provenance: "heuristic",
                ..ReferenceEntry::default()
            }
        })
        .collect()
}

fn split_after_years(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut last = 0;
    for m in YEAR_TOKEN.find_iter(text) {
        // Drop the sentence punctuation the previous entry left behind
        let chunk = text[last..m.end()].trim().trim_start_matches(['.', ',', ';']).trim_start();
        chunks.push(chunk.to_string());
        last = m.end();
    }
    let tail = text[last..].trim();
    if chunks.is_empty() {
        chunks.push(text.to_string());
    } else if !tail.is_empty() {
        // Trailing text without its own year belongs to the last entry
        let last_chunk = chunks.last_mut().unwrap();
        last_chunk.push(' ');
        last_chunk.push_str(tail);
    }
    chunks.retain(|c| !c.is_empty());
    chunks
}

// ============================================================================
// Formatting
// ============================================================================

fn initials(given: &str) -> String {
    given
        .split(['-', ' '])
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

fn year_from_date(date: &str) -> Option<&str> {
    YEAR_TOKEN.find(date).map(|m| m.as_str())
}

/// Compact Vancouver-like rendering of one entry.
pub fn format_reference(rec: &ReferenceEntry) -> String {
    // Heuristic entries carry nothing structured beyond a year; their
    // raw text is the best rendering
    if let Some(raw) = rec.raw.as_deref()
        && rec.authors.is_empty()
        && rec.title.is_none()
    {
        return raw.to_string();
    }

    let mut parts: Vec<String> = Vec::new();

    let authors: Vec<String> = rec
        .authors
        .iter()
        .filter_map(|a| {
            let fam = a.family.as_deref().or(a.full.as_deref())?.trim();
            if fam.is_empty() {
                return None;
            }
            let inits = a.given.as_deref().map(initials).unwrap_or_default();
            Some(if inits.is_empty() { fam.to_string() } else { format!("{fam} {inits}") })
        })
        .collect();
    if !authors.is_empty() {
        parts.push(authors.join(", "));
    }

    if let Some(title) = rec.title.as_deref().filter(|t| !t.is_empty()) {
        parts.push(format!("{title}."));
    }

    let mut tail: Vec<String> = Vec::new();
    if let Some(journal) = rec.journal.as_deref().filter(|j| !j.is_empty()) {
        tail.push(journal.to_string());
    }
    if let Some(year) = rec.date.as_deref().and_then(year_from_date) {
        tail.push(year.to_string());
    }
    let vol = rec.volume.as_deref().unwrap_or("");
    let iss = rec.issue.as_deref().unwrap_or("");
    let vi = match (vol.is_empty(), iss.is_empty()) {
        (false, false) => format!("{vol}({iss})"),
        (false, true) => vol.to_string(),
        (true, false) => format!("({iss})"),
        (true, true) => String::new(),
    };
    if !vi.is_empty() {
        tail.push(vi);
    }
    if let Some(pages) = rec.pages.as_deref().filter(|p| !p.is_empty()) {
        tail.push(pages.to_string());
    }
    if !tail.is_empty() {
        parts.push(tail.join(" "));
    }

    if let Some(doi) = rec.doi.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("doi:{doi}"));
    }
    parts.join(" ")
}

pub fn format_references_list(items: &[ReferenceEntry]) -> Vec<String> {
    items.iter().map(format_reference).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tei;

    const STRUCTURED: &str = r#"<TEI><text><back>
        <div type="references"><listBibl>
            <biblStruct>
                <analytic>
                    <title>Osseointegration revisited</title>
                    <author><persName><forename>Per-Ingvar</forename><surname>Branemark</surname></persName></author>
                    <author><persName><forename>Anna</forename><surname>Berg</surname></persName></author>
                    <idno type="DOI">https://doi.org/10.1111/jre.12345</idno>
                </analytic>
                <monogr>
                    <title>J Periodontal Res</title>
                    <imprint>
                        <date when="2019-03-01"/>
                        <biblScope unit="volume">54</biblScope>
                        <biblScope unit="issue">2</biblScope>
                        <biblScope unit="page" from="123" to="131">123-131</biblScope>
                    </imprint>
                </monogr>
            </biblStruct>
        </listBibl></div>
    </back></text></TEI>"#;

    #[test]
    fn test_structured_fields() {
        let doc = Tei::parse(STRUCTURED).unwrap();
        let refs = parse_references(&doc);
        assert_eq!(refs.len(), 1);
        let r = &refs[0];
        assert_eq!(r.provenance, "structured");
        assert_eq!(r.title.as_deref(), Some("Osseointegration revisited"));
        assert_eq!(r.journal.as_deref(), Some("J Periodontal Res"));
        assert_eq!(r.date.as_deref(), Some("2019-03-01"));
        assert_eq!(r.volume.as_deref(), Some("54"));
        assert_eq!(r.issue.as_deref(), Some("2"));
        assert_eq!(r.pages.as_deref(), Some("123-131"));
        assert_eq!(r.doi.as_deref(), Some("10.1111/jre.12345"));
        assert_eq!(r.authors.len(), 2);
        assert_eq!(r.authors[0].family.as_deref(), Some("Branemark"));
    }

    #[test]
    fn test_structured_dedupes_repeats() {
        let xml = r#"<TEI><listBibl>
            <biblStruct><monogr><title>Same Book</title>
                <imprint><date when="2001"/></imprint></monogr></biblStruct>
            <biblStruct><monogr><title>Same Book</title>
                <imprint><date when="2001"/></imprint></monogr></biblStruct>
        </listBibl></TEI>"#;
        let doc = Tei::parse(xml).unwrap();
        assert_eq!(parse_references(&doc).len(), 1);
    }

    #[test]
    fn test_norm_doi_variants() {
        assert_eq!(norm_doi("doi:10.1000/x1").as_deref(), Some("10.1000/x1"));
        assert_eq!(norm_doi("https://dx.doi.org/10.1000/x1").as_deref(), Some("10.1000/x1"));
        assert_eq!(norm_doi("/10.1000/x1.").as_deref(), Some("10.1000/x1"));
        assert_eq!(norm_doi("  "), None);
    }

    #[test]
    fn test_fallback_splits_at_doi_boundaries() {
        // Two entries, each closed by its own DOI
        let xml = r#"<TEI><text><back><div type="references"><head>References</head>
            <p>Smith J. Enamel wear in vitro. J Dent Res 2018. 10.1177/0022034518000001
               Jones K. Dentin bonding revisited. Dent Mater 2020. 10.1016/j.dental.2020.01.002</p>
        </div></back></text></TEI>"#;
        let doc = Tei::parse(xml).unwrap();
        let refs = parse_references(&doc);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].provenance, "heuristic");
        assert_eq!(refs[0].doi.as_deref(), Some("10.1177/0022034518000001"));
        assert!(refs[0].raw.as_deref().unwrap().starts_with("Smith J."));
        assert_eq!(refs[1].doi.as_deref(), Some("10.1016/j.dental.2020.01.002"));
        assert!(refs[1].raw.as_deref().unwrap().starts_with("Jones K."));
        assert_eq!(refs[0].date.as_deref(), Some("2018"));
    }

    #[test]
    fn test_fallback_year_split_without_dois() {
        let xml = r#"<TEI><div type="references">
            <p>Lee H. First study. Periodontol 1998. Park S. Second study. Clin Oral 2005.</p>
        </div></TEI>"#;
        let doc = Tei::parse(xml).unwrap();
        let refs = parse_references(&doc);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].date.as_deref(), Some("1998"));
        assert_eq!(refs[1].date.as_deref(), Some("2005"));
        assert!(refs[1].raw.as_deref().unwrap().starts_with("Park S."));
    }

    #[test]
    fn test_fallback_finds_heading_only_references_div() {
        // No type attribute; the heading alone identifies the section
        let xml = r#"<TEI><text><back><div><head>References</head>
            <p>Lee H. First study. Periodontol 1998. Park S. Second study. Clin Oral 2005.</p>
        </div></back></text></TEI>"#;
        let doc = Tei::parse(xml).unwrap();
        let refs = parse_references(&doc);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].provenance, "heuristic");
        assert_eq!(refs[0].date.as_deref(), Some("1998"));
        assert!(refs[1].raw.as_deref().unwrap().starts_with("Park S."));
    }

    #[test]
    fn test_fallback_trailing_text_joins_last_entry() {
        let refs = parse_heuristic("Alpha 1999 Beta trailing tail");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].raw.as_deref(), Some("Alpha 1999 Beta trailing tail"));
    }

    #[test]
    fn test_no_references_at_all() {
        let doc = Tei::parse("<TEI><text><body><p>No refs here.</p></body></text></TEI>").unwrap();
        assert!(parse_references(&doc).is_empty());
    }

    #[test]
    fn test_format_reference_full() {
        let doc = Tei::parse(STRUCTURED).unwrap();
        let refs = parse_references(&doc);
        assert_eq!(
            format_reference(&refs[0]),
            "Branemark PI, Berg A Osseointegration revisited. \
             J Periodontal Res 2019 54(2) 123-131 doi:10.1111/jre.12345"
        );
    }

    #[test]
    fn test_format_reference_heuristic_uses_raw() {
        let rec = ReferenceEntry {
            raw: Some("Smith J. Some paper. 2001.".into()),
            provenance: "heuristic",
            ..ReferenceEntry::default()
        };
        assert_eq!(format_reference(&rec), "Smith J. Some paper. 2001.");
    }
}
