//! Section content extraction.
//!
//! Each canonical key is resolved through an ordered chain of
//! strategies, each attempted only when everything before it produced
//! nothing:
//!
//! 1. Explicit structural type hint (`<div type="results">`)
//! 2. First subtree whose heading canonicalizes to the key
//! 3. Aggregate of all matching subtrees in document order
//! 4. The same three steps scoped to the abstract (mini-sections
//!    embedded in structured abstracts)
//! 5. Inline labels inside abstract text ("Results: … Conclusions: …")
//!
//! The chain is an explicit list of strategy objects so ordering is
//! testable per strategy; which strategy fired is recorded as the
//! section's provenance tag.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::clean::{clean_subtree, scrub_text};
use crate::mapping::{CanonicalKey, SectionKey, canonicalize, is_heading_of, sanitize_heading};
use crate::record::PaperRecord;
use crate::tree::{NodeId, Tei};
use crate::util::push_deduped;
use crate::{journals, media, meta, refs};

/// Text recovered for a section, tagged with the strategy that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub provenance: &'static str,
}

/// `div type=…` values the structuring service emits per key.
fn type_hints(key: SectionKey) -> &'static [&'static str] {
    match key {
        SectionKey::Abstract => &["abstract"],
        SectionKey::Introduction => &["introduction", "background"],
        SectionKey::MaterialsAndMethods => &["methods", "materialsMethods"],
        SectionKey::Results => &["results"],
        SectionKey::Discussion => &["discussion"],
        SectionKey::Conclusions => &["conclusion", "conclusions", "clinicalSignificance"],
        SectionKey::ResultsAndDiscussion => &["resultsAndDiscussion", "resultsDiscussion"],
    }
}

/// Root of the main text, falling back to the document root when the
/// service omitted the `text` wrapper.
pub(crate) fn body_scope(doc: &Tei) -> NodeId {
    doc.first_named(NodeId::ROOT, "text").unwrap_or(NodeId::ROOT)
}

/// The abstract subtree: header `abstract` element, else a type-hinted
/// body div.
fn abstract_scope(doc: &Tei) -> Option<NodeId> {
    if let Some(header) = doc.first_named(NodeId::ROOT, "teiHeader")
        && let Some(abs) = doc.first_named(header, "abstract")
    {
        return Some(abs);
    }
    doc.descendants_named(body_scope(doc), "div")
        .find(|&div| doc.attr(div, "type") == Some("abstract"))
}

pub(crate) fn heading_of(doc: &Tei, div: NodeId) -> Option<String> {
    let head = doc.child_named(div, "head")?;
    let text = doc.text(head);
    (!text.is_empty()).then_some(text)
}

fn div_matches(doc: &Tei, div: NodeId, key: SectionKey) -> bool {
    if let Some(ty) = doc.attr(div, "type")
        && type_hints(key).contains(&ty)
    {
        return true;
    }
    heading_of(doc, div).is_some_and(|h| is_heading_of(&h, key))
}

// ============================================================================
// Strategy chain
// ============================================================================

trait Strategy: Sync {
    fn name(&self) -> &'static str;
    fn run(&self, doc: &Tei, scope: NodeId, key: SectionKey) -> Option<String>;
}

/// Step 1: explicit structural type hint.
struct TypeHint;

impl Strategy for TypeHint {
    fn name(&self) -> &'static str {
        "type-hint"
    }

    fn run(&self, doc: &Tei, scope: NodeId, key: SectionKey) -> Option<String> {
        let div = doc
            .descendants_named(scope, "div")
            .find(|&div| matches!(doc.attr(div, "type"), Some(ty) if type_hints(key).contains(&ty)))?;
        non_empty(clean_subtree(doc, div))
    }
}

/// Step 2: first subtree whose heading canonicalizes to the key.
struct HeadingMatch;

impl Strategy for HeadingMatch {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn run(&self, doc: &Tei, scope: NodeId, key: SectionKey) -> Option<String> {
        let div = doc
            .descendants_named(scope, "div")
            .find(|&div| heading_of(doc, div).is_some_and(|h| is_heading_of(&h, key)))?;
        non_empty(clean_subtree(doc, div))
    }
}

/// Step 3: union of all matching subtrees in document order, collapsing
/// consecutive duplicate blocks.
struct Aggregate;

impl Strategy for Aggregate {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn run(&self, doc: &Tei, scope: NodeId, key: SectionKey) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        for div in doc.descendants_named(scope, "div") {
            if div_matches(doc, div, key) {
                push_deduped(&mut parts, clean_subtree(doc, div));
            }
        }
        non_empty(parts.join("\n\n"))
    }
}

/// Step 4: repeat steps 1-3 inside the abstract subtree.
struct AbstractScoped;

impl Strategy for AbstractScoped {
    fn name(&self) -> &'static str {
        "abstract"
    }

    fn run(&self, doc: &Tei, _scope: NodeId, key: SectionKey) -> Option<String> {
        let abs = abstract_scope(doc)?;
        for inner in [&TypeHint as &dyn Strategy, &HeadingMatch, &Aggregate] {
            if let Some(text) = inner.run(doc, abs, key) {
                return Some(text);
            }
        }
        None
    }
}

/// Step 5: inline label tokens inside abstract paragraphs. Content runs
/// from the label to the next recognized label or the end of the text.
struct InlineLabel;

lazy_static! {
    /// Candidate label: start of text or a sentence boundary, a short
    /// word run, then a colon.
    static ref INLINE_LABEL: Regex =
        Regex::new(r"(?i)(?:^|[.;]\s+)([a-z][a-z &]{2,40}?)\s*:\s*").unwrap();
}

impl Strategy for InlineLabel {
    fn name(&self) -> &'static str {
        "abstract-inline"
    }

    fn run(&self, doc: &Tei, _scope: NodeId, key: SectionKey) -> Option<String> {
        let abs = abstract_scope(doc)?;
        let text = clean_subtree(doc, abs).replace('\n', " ");

        // Every recognized label is a boundary; the requested key may
        // appear more than once, first hit wins.
        let labels: Vec<(usize, usize, CanonicalKey)> = INLINE_LABEL
            .captures_iter(&text)
            .filter_map(|cap| {
                let m = cap.get(1)?;
                let canon = canonicalize(m.as_str())?;
                let end = cap.get(0)?.end();
                Some((m.start(), end, canon))
            })
            .collect();

        let (idx, &(_, start, _)) = labels
            .iter()
            .enumerate()
            .find(|(_, (_, _, canon))| *canon == CanonicalKey::Section(key))?;
        let end = labels
            .get(idx + 1)
            .map_or(text.len(), |&(label_start, _, _)| label_start);
        non_empty(scrub_text(text[start..end].trim()))
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

static CHAIN: [&dyn Strategy; 5] =
    [&TypeHint, &HeadingMatch, &Aggregate, &AbstractScoped, &InlineLabel];

/// Extract the given section, trying each strategy in order and
/// returning the first non-empty result.
pub fn extract(doc: &Tei, key: SectionKey) -> Option<Extracted> {
    for strategy in CHAIN {
        if let Some(text) = strategy.run(doc, body_scope(doc), key) {
            debug!("section {} resolved via {}", key.as_str(), strategy.name());
            return Some(Extracted { text, provenance: strategy.name() });
        }
    }
    debug!("section {} not found", key.as_str());
    None
}

/// Aggregate variant: union of all matches instead of the first, with
/// the abstract fallbacks unchanged.
pub fn extract_aggregate(doc: &Tei, key: SectionKey) -> Option<Extracted> {
    for strategy in [&Aggregate as &dyn Strategy, &AbstractScoped, &InlineLabel] {
        if let Some(text) = strategy.run(doc, body_scope(doc), key) {
            return Some(Extracted { text, provenance: strategy.name() });
        }
    }
    None
}

// ============================================================================
// Driver
// ============================================================================

/// Assemble the full record for one document: metadata, one extractor
/// pass per canonical key, unmapped/non-content sections, media,
/// references, and finally the journal override layer.
pub fn slice(doc: &Tei) -> PaperRecord {
    let mut rec = PaperRecord { meta: meta::extract_meta(doc), ..PaperRecord::default() };

    // Abstract prefers the header copy; body fallbacks otherwise.
    if let Some(abs) = abstract_scope(doc) {
        if let Some(text) = non_empty(clean_subtree(doc, abs)) {
            rec.set_section(SectionKey::Abstract, text, "header");
        }
    } else if let Some(ext) = extract(doc, SectionKey::Abstract) {
        rec.set_section(SectionKey::Abstract, ext.text, ext.provenance);
    }

    for key in [
        SectionKey::Introduction,
        SectionKey::MaterialsAndMethods,
        SectionKey::Results,
        SectionKey::Discussion,
        SectionKey::Conclusions,
        SectionKey::ResultsAndDiscussion,
    ] {
        if let Some(ext) = extract(doc, key) {
            rec.set_section(key, ext.text, ext.provenance);
        }
    }

    // A combined section backfills only empty results/discussion fields,
    // never overwriting text found independently.
    if let Some(combined) = rec.section(SectionKey::ResultsAndDiscussion).map(str::to_string) {
        for key in [SectionKey::Results, SectionKey::Discussion] {
            if rec.section(key).is_none() {
                debug!("backfilling {} from combined section", key.as_str());
                rec.set_section(key, combined.clone(), "results_and_discussion");
            }
        }
    }

    collect_other_sections(doc, &mut rec);

    for item in media::locate(doc) {
        match item.kind {
            media::MediaKind::Figure => rec.figures.push(item),
            media::MediaKind::Table => rec.tables.push(item),
        }
    }

    rec.references = refs::parse_references(doc);

    journals::apply_overrides(&mut rec, doc);
    rec
}

/// Preserve headings the canonicalizer could not classify, plus
/// recognized non-content sections, for inspection.
fn collect_other_sections(doc: &Tei, rec: &mut PaperRecord) {
    for div in doc.descendants_named(body_scope(doc), "div") {
        let Some(heading) = heading_of(doc, div) else {
            continue;
        };
        let sanitized = sanitize_heading(&heading);
        // Figure/table heads sometimes surface as body sections
        if sanitized.starts_with("fig.")
            || sanitized.starts_with("figure ")
            || sanitized.starts_with("table ")
        {
            continue;
        }
        match canonicalize(&heading) {
            Some(CanonicalKey::Section(_)) => {}
            Some(CanonicalKey::NonContent(key)) => {
                rec.push_other(key.to_string(), clean_subtree(doc, div));
            }
            None => {
                if !sanitized.is_empty() {
                    rec.push_other(sanitized, clean_subtree(doc, div));
                }
            }
        }
    }
}
