//! Journal-specific override layer.
//!
//! Runs after generic extraction. Each handler inspects the assembled
//! record (and the source tree) and may adjust sections; handlers run
//! in registration order, generic review handling before
//! journal-specific ones, and never delete `other_sections` entries.

use log::debug;

use crate::record::PaperRecord;
use crate::tree::Tei;

mod periodontology;
mod review;

pub(crate) trait JournalOverride: Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, rec: &PaperRecord, doc: &Tei) -> bool;
    /// Adjust the record; returns the names of the sections touched.
    fn apply(&self, rec: &mut PaperRecord, doc: &Tei) -> Vec<&'static str>;
}

static OVERRIDES: [&dyn JournalOverride; 2] =
    [&review::ReviewOverride, &periodontology::Periodontology2000];

pub(crate) fn apply_overrides(rec: &mut PaperRecord, doc: &Tei) {
    for handler in OVERRIDES {
        if !handler.matches(rec, doc) {
            continue;
        }
        let changed = handler.apply(rec, doc);
        if !changed.is_empty() {
            debug!("journal override {} adjusted {:?}", handler.name(), changed);
        }
    }
}

/// Back-matter headings that must never be aggregated into body
/// sections: declarations, identifiers, and bibliography.
fn is_back_matter(head: &str) -> bool {
    const SUBSTRINGS: [&str; 15] = [
        "orcid",
        "data availability",
        "availability of data",
        "conflict of interest",
        "conflicts of interest",
        "competing interest",
        "author contribution",
        "acknowledg",
        "funding",
        "trial registration",
        "publisher",
        "ethic",
        "consent",
        "abbreviation",
        "bibliograph",
    ];
    let lowered = head.to_lowercase().replace('_', " ");
    lowered == "references" || SUBSTRINGS.iter().any(|s| lowered.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_matter_detection() {
        assert!(is_back_matter("Acknowledgements"));
        assert!(is_back_matter("conflict_of_interest"));
        assert!(is_back_matter("Data Availability Statement"));
        assert!(is_back_matter("references"));
        assert!(!is_back_matter("Epidemiology of peri-implantitis"));
    }
}
