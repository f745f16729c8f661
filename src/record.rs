//! The assembled output record.
//!
//! Everything in here is a read-only projection of one input tree: the
//! caller owns persistence, identity, and export formats.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::mapping::SectionKey;
use crate::media::MediaItem;
use crate::meta::Meta;
use crate::refs::ReferenceEntry;

/// Canonical representation of one paper.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PaperRecord {
    pub meta: Meta,
    /// Canonical key to assembled, cleaned text. At most one string per
    /// key; repeated source subtrees concatenate in document order.
    pub sections: BTreeMap<SectionKey, String>,
    /// Which strategy produced each section. Diagnostics only.
    pub section_provenance: BTreeMap<SectionKey, &'static str>,
    /// Headings that could not be classified (keyed by sanitized
    /// heading) plus recognized non-content sections (keyed by their
    /// canonical key). Never dropped, always inspectable.
    pub other_sections: BTreeMap<String, String>,
    pub figures: Vec<MediaItem>,
    pub tables: Vec<MediaItem>,
    pub references: Vec<ReferenceEntry>,
}

impl PaperRecord {
    /// Section text, if present and non-empty.
    pub fn section(&self, key: SectionKey) -> Option<&str> {
        self.sections
            .get(&key)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub(crate) fn set_section(&mut self, key: SectionKey, text: String, provenance: &'static str) {
        self.sections.insert(key, text);
        self.section_provenance.insert(key, provenance);
    }

    /// Append to an inspectable non-canonical section, concatenating
    /// repeats with a blank line.
    pub(crate) fn push_other(&mut self, key: String, text: String) {
        if text.is_empty() {
            return;
        }
        self.other_sections
            .entry(key)
            .and_modify(|existing| {
                if existing.as_str() != text {
                    existing.push_str("\n\n");
                    existing.push_str(&text);
                }
            })
            .or_insert(text);
    }
}
