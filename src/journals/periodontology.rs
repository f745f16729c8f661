//! Overrides for Periodontology 2000 review articles.
//!
//! These issues are invited topical reviews whose bodies consist of
//! subject headings with no Results/Discussion structure at all. The
//! handler aggregates the topical divisions between the introduction
//! and the conclusions/references boundary into the discussion, and
//! undoes a generic aggregate that was misfiled as results.

use crate::clean::clean_subtree;
use crate::extract::{body_scope, heading_of};
use crate::mapping::{CanonicalKey, SectionKey, canonicalize};
use crate::record::PaperRecord;
use crate::tree::Tei;

use super::{JournalOverride, is_back_matter};

pub(super) struct Periodontology2000;

impl JournalOverride for Periodontology2000 {
    fn name(&self) -> &'static str {
        "periodontology2000"
    }

    fn matches(&self, rec: &PaperRecord, _doc: &Tei) -> bool {
        rec.meta
            .journal
            .as_deref()
            .is_some_and(|j| j.to_lowercase().contains("periodontology 2000"))
    }

    fn apply(&self, rec: &mut PaperRecord, doc: &Tei) -> Vec<&'static str> {
        let agg = aggregate_topical_body(doc);
        if agg.is_empty() {
            return Vec::new();
        }
        let mut changed = Vec::new();

        if rec.section(SectionKey::Discussion).is_none() {
            rec.set_section(SectionKey::Discussion, agg.clone(), "periodontology2000");
            changed.push("discussion");
        }
        // A generic pass sometimes files the same aggregate under
        // results; topical reviews have no results section
        if rec.section(SectionKey::Results) == Some(agg.as_str()) {
            rec.sections.remove(&SectionKey::Results);
            rec.section_provenance.remove(&SectionKey::Results);
            changed.push("results");
        }
        changed
    }
}

/// Cleaned text of the topical divisions strictly between the
/// introduction and the first conclusions or references division,
/// excluding back matter and anything the canonicalizer already maps.
fn aggregate_topical_body(doc: &Tei) -> String {
    let divs: Vec<_> = doc.descendants_named(body_scope(doc), "div").collect();

    let mut intro_idx = None;
    let mut end_idx = None;
    for (i, &div) in divs.iter().enumerate() {
        let canon = heading_of(doc, div).and_then(|h| canonicalize(&h));
        match canon {
            Some(CanonicalKey::Section(SectionKey::Introduction)) if intro_idx.is_none() => {
                intro_idx = Some(i);
            }
            Some(CanonicalKey::Section(SectionKey::Conclusions))
            | Some(CanonicalKey::NonContent("references"))
            | Some(CanonicalKey::NonContent("bibliography"))
                if end_idx.is_none() =>
            {
                end_idx = Some(i);
            }
            _ => {}
        }
    }
    let start = intro_idx.map_or(0, |i| i + 1);
    let stop = end_idx.unwrap_or(divs.len()).max(start);

    let mut parts: Vec<String> = Vec::new();
    for &div in &divs[start..stop] {
        let Some(heading) = heading_of(doc, div) else {
            continue;
        };
        if is_back_matter(&heading) || canonicalize(&heading).is_some() {
            continue;
        }
        let text = clean_subtree(doc, div);
        if !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join("\n\n")
}
