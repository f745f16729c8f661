//! Generic handling for review and consensus papers.
//!
//! Reviews rarely carry Results/Discussion heads; their topical
//! sections land in `other_sections`. This handler folds method-like
//! leftovers into the methods section and, when the discussion is
//! missing or very short, aggregates the remaining topical sections
//! into it so the record is not hollow.

use crate::extract::heading_of;
use crate::mapping::{CanonicalKey, SectionKey, canonicalize};
use crate::record::PaperRecord;
use crate::tree::Tei;

use super::{JournalOverride, is_back_matter};

/// Review-style sections that signal a systematic methodology.
const METHOD_MARKERS: [&str; 5] = [
    "search strategy",
    "study selection",
    "data extraction",
    "risk of bias",
    "quality assessment",
];

/// Discussions shorter than this are treated as effectively missing.
const WEAK_DISCUSSION_LEN: usize = 300;

pub(super) struct ReviewOverride;

impl JournalOverride for ReviewOverride {
    fn name(&self) -> &'static str {
        "review"
    }

    fn matches(&self, rec: &PaperRecord, doc: &Tei) -> bool {
        let title = rec.meta.title.as_deref().unwrap_or("").to_lowercase();
        if ["review", "systematic", "meta-analysis", "meta analysis"]
            .iter()
            .any(|m| title.contains(m))
        {
            return true;
        }
        let journal = rec.meta.journal.as_deref().unwrap_or("").to_lowercase();
        if journal.contains("periodontology 2000") {
            return true;
        }
        // Method-like review sections anywhere in the body
        rec.other_sections.keys().chain(body_headings(doc).iter()).any(|head| {
            let head = head.to_lowercase();
            METHOD_MARKERS.iter().any(|m| head.contains(m))
        })
    }

    fn apply(&self, rec: &mut PaperRecord, _doc: &Tei) -> Vec<&'static str> {
        let mut changed = Vec::new();

        // Fold method-like leftovers into the methods section
        let method_heads: Vec<String> = rec
            .other_sections
            .keys()
            .filter(|head| is_methodish(head))
            .cloned()
            .collect();
        for head in &method_heads {
            let text = rec.other_sections[head].clone();
            if text.is_empty() {
                continue;
            }
            append_section(rec, SectionKey::MaterialsAndMethods, &text, "review");
            if !changed.contains(&"materials_and_methods") {
                changed.push("materials_and_methods");
            }
        }

        // Aggregate remaining topical sections into a weak discussion
        let disc_len = rec.section(SectionKey::Discussion).map_or(0, str::len);
        if disc_len < WEAK_DISCUSSION_LEN {
            let parts: Vec<String> = rec
                .other_sections
                .iter()
                .filter(|(head, text)| {
                    !text.is_empty()
                        && !method_heads.contains(head)
                        && !is_methodish(head)
                        && !is_back_matter(head)
                })
                .map(|(head, text)| format!("{head}\n{text}"))
                .collect();
            if !parts.is_empty() {
                append_section(rec, SectionKey::Discussion, &parts.join("\n\n"), "review");
                changed.push("discussion");
            }
        }
        changed
    }
}

fn is_methodish(head: &str) -> bool {
    let lowered = head.to_lowercase();
    if METHOD_MARKERS.iter().any(|m| lowered.contains(m)) {
        return true;
    }
    matches!(
        canonicalize(head),
        Some(CanonicalKey::Section(SectionKey::MaterialsAndMethods))
    )
}

fn append_section(rec: &mut PaperRecord, key: SectionKey, text: &str, provenance: &'static str) {
    match rec.section(key).map(str::to_string) {
        Some(existing) => {
            rec.set_section(key, format!("{existing}\n\n{text}"), provenance);
        }
        None => rec.set_section(key, text.to_string(), provenance),
    }
}

fn body_headings(doc: &Tei) -> Vec<String> {
    doc.descendants_named(crate::extract::body_scope(doc), "div")
        .filter_map(|div| heading_of(doc, div))
        .collect()
}
