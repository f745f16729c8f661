//! Heading canonicalization.
//!
//! Maps free-text section headings, as found across thousands of
//! journals, onto a closed vocabulary of canonical section keys. The
//! synonym table is a compile-time perfect hash map and the keyword
//! families are ordered so that composite headings ("Results and
//! Discussion") always win over their single-key prefixes.
//!
//! Everything here is pure and allocation-light: normalize, then try
//! exact match, space-removed exact match, the composite guard, prefix
//! match, and finally substring keyword families.

use std::collections::HashMap;

use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::util::norm_ws;

/// Canonical content section of a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Abstract,
    Introduction,
    MaterialsAndMethods,
    Results,
    Discussion,
    Conclusions,
    ResultsAndDiscussion,
}

impl SectionKey {
    /// All content keys, in the order the driver extracts them.
    pub const ALL: [SectionKey; 7] = [
        SectionKey::Abstract,
        SectionKey::Introduction,
        SectionKey::MaterialsAndMethods,
        SectionKey::Results,
        SectionKey::Discussion,
        SectionKey::Conclusions,
        SectionKey::ResultsAndDiscussion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Abstract => "abstract",
            SectionKey::Introduction => "introduction",
            SectionKey::MaterialsAndMethods => "materials_and_methods",
            SectionKey::Results => "results",
            SectionKey::Discussion => "discussion",
            SectionKey::Conclusions => "conclusions",
            SectionKey::ResultsAndDiscussion => "results_and_discussion",
        }
    }
}

/// Result of canonicalizing a heading.
///
/// Non-content keys (acknowledgements, funding, references, …) are
/// recognized so they can be excluded from the main section record while
/// remaining inspectable; unmapped headings canonicalize to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CanonicalKey {
    Section(SectionKey),
    NonContent(&'static str),
}

impl CanonicalKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalKey::Section(key) => key.as_str(),
            CanonicalKey::NonContent(key) => key,
        }
    }

    pub fn is_non_content(&self) -> bool {
        matches!(self, CanonicalKey::NonContent(_))
    }
}

use CanonicalKey::{NonContent, Section};
use SectionKey::*;

/// Exact synonym table, keyed by sanitized heading text.
///
/// Grown from heading-frequency harvests over a dental/medical corpus;
/// `&` and `/` are folded to "and" before lookup so ampersand variants
/// do not need their own rows.
static EXACT: phf::Map<&'static str, CanonicalKey> = phf_map! {
    // Core
    "abstract" => Section(Abstract),
    "introduction" => Section(Introduction),
    "background" => Section(Introduction),
    "methods" => Section(MaterialsAndMethods),
    "materials" => Section(MaterialsAndMethods),
    "materials and methods" => Section(MaterialsAndMethods),
    "methods and materials" => Section(MaterialsAndMethods),
    "methodology" => Section(MaterialsAndMethods),
    "patients and methods" => Section(MaterialsAndMethods),
    "subjects and methods" => Section(MaterialsAndMethods),
    "study design" => Section(MaterialsAndMethods),
    "experimental procedures" => Section(MaterialsAndMethods),
    "data analysis" => Section(MaterialsAndMethods),
    "statistical analysis" => Section(MaterialsAndMethods),
    "statistical methods" => Section(MaterialsAndMethods),
    "statistics" => Section(MaterialsAndMethods),
    "sample size calculation" => Section(MaterialsAndMethods),
    "power analysis" => Section(MaterialsAndMethods),
    "sample size determination" => Section(MaterialsAndMethods),
    "eligibility criteria" => Section(MaterialsAndMethods),
    "inclusion criteria" => Section(MaterialsAndMethods),
    "exclusion criteria" => Section(MaterialsAndMethods),
    "inclusion and exclusion criteria" => Section(MaterialsAndMethods),
    "participants" => Section(MaterialsAndMethods),
    "study population" => Section(MaterialsAndMethods),
    "sample preparation" => Section(MaterialsAndMethods),
    "specimen preparation" => Section(MaterialsAndMethods),
    "radiographic analysis" => Section(MaterialsAndMethods),
    "radiographic analyses" => Section(MaterialsAndMethods),
    "clinical examination" => Section(MaterialsAndMethods),
    "clinical examinations" => Section(MaterialsAndMethods),
    "evaluation of volume loss" => Section(MaterialsAndMethods),
    "scanning" => Section(MaterialsAndMethods),
    "drink selection" => Section(MaterialsAndMethods),
    "microscope positioning and use" => Section(MaterialsAndMethods),
    "flap incision and elevation" => Section(MaterialsAndMethods),
    "root apex positioning" => Section(MaterialsAndMethods),
    "root end resection, curettage, and inspection" => Section(MaterialsAndMethods),
    "suturing" => Section(MaterialsAndMethods),
    "suture removal" => Section(MaterialsAndMethods),
    "outcome measure" => Section(MaterialsAndMethods),
    "outcome measures" => Section(MaterialsAndMethods),
    "randomization and blinding" => Section(MaterialsAndMethods),
    "design" => Section(MaterialsAndMethods),
    "sample and setting" => Section(MaterialsAndMethods),
    "protocol and registration" => Section(MaterialsAndMethods),
    "data charting and synthesis" => Section(MaterialsAndMethods),
    "in vivo studies" => Section(MaterialsAndMethods),
    "medical preparations" => Section(MaterialsAndMethods),
    "patient preparation" => Section(MaterialsAndMethods),
    "surgical area preparation" => Section(MaterialsAndMethods),
    "surgical procedures" => Section(MaterialsAndMethods),
    "search strategy" => Section(MaterialsAndMethods),
    "study selection" => Section(MaterialsAndMethods),
    "data extraction" => Section(MaterialsAndMethods),
    "quality assessment" => Section(MaterialsAndMethods),
    "methodological quality" => Section(MaterialsAndMethods),
    "risk of bias" => Section(MaterialsAndMethods),
    "risk of bias assessment" => Section(MaterialsAndMethods),
    "indications" => Section(MaterialsAndMethods),
    "contraindications" => Section(MaterialsAndMethods),
    "systemic conditions" => Section(MaterialsAndMethods),
    "local conditions" => Section(MaterialsAndMethods),
    "preoperative examination" => Section(MaterialsAndMethods),
    "history and preoperative examination" => Section(MaterialsAndMethods),
    // Intro-like
    "research question" => Section(Introduction),
    "review question" => Section(Introduction),
    "current medical therapy" => Section(Introduction),
    "legislative context" => Section(Introduction),
    "a brief history of artificial intelligence and its applications in dentistry" => Section(Introduction),
    // Discussion / Conclusions-like
    "interpretation of key findings" => Section(Discussion),
    "agreements and disagreements with other studies or reviews" => Section(Discussion),
    "clinical management" => Section(Discussion),
    "grading the certainty of evidence" => Section(Discussion),
    "certainty of evidence" => Section(Discussion),
    "grade approach" => Section(Discussion),
    "comparison with previous research" => Section(Discussion),
    "implications and significance of the study" => Section(Discussion),
    "limitations" => Section(Discussion),
    "strengths and limitations" => Section(Discussion),
    "discussion" => Section(Discussion),
    "summary of key findings" => Section(Conclusions),
    "summary of main findings" => Section(Conclusions),
    "possible applications of research and future research directions" => Section(Conclusions),
    "clinical considerations and practical recommendations" => Section(Conclusions),
    "conclusion" => Section(Conclusions),
    "conclusions" => Section(Conclusions),
    "clinical significance" => Section(Conclusions),
    // Results-like
    "results" => Section(Results),
    "main outcome of the study" => Section(Results),
    "outcomes" => Section(Results),
    "vertical bone gain" => Section(Results),
    "horizontal bone gain" => Section(Results),
    "other complications" => Section(Results),
    "clinical outcomes" => Section(Results),
    "colour maps of implantation torque values" => Section(Results),
    "comparison of measurements between implants" => Section(Results),
    "correlation" => Section(Results),
    "success rates" => Section(Results),
    "survival rates" => Section(Results),
    "complication rates" => Section(Results),
    "analysis of subdomain-diagnosis" => Section(Results),
    "analysis of subdomain-treatment planning" => Section(Results),
    "analysis of subdomain-feedback" => Section(Results),
    "case report" => Section(Results),
    "follow-up" => Section(Results),
    // Composite
    "results and discussion" => Section(ResultsAndDiscussion),
    // Methods batch from unmapped-heading harvests
    "evaluation of ph" => Section(MaterialsAndMethods),
    "volume loss test" => Section(MaterialsAndMethods),
    "volume loss evaluation" => Section(MaterialsAndMethods),
    "pathological examination" => Section(MaterialsAndMethods),
    "postoperative management postoperative reactions" => Section(MaterialsAndMethods),
    "efficacy evaluation" => Section(MaterialsAndMethods),
    "medical records" => Section(MaterialsAndMethods),
    "included studies" => Section(MaterialsAndMethods),
    "evaluation of titratable acidity" => Section(MaterialsAndMethods),
    "animals" => Section(MaterialsAndMethods),
    "surgical interventions" => Section(MaterialsAndMethods),
    "primary outcome" => Section(MaterialsAndMethods),
    "secondary outcomes" => Section(MaterialsAndMethods),
    "histological preparation" => Section(MaterialsAndMethods),
    "analysis" => Section(MaterialsAndMethods),
    "histomorphometric analysis" => Section(MaterialsAndMethods),
    "circularly polarized light microscopy analysis" => Section(MaterialsAndMethods),
    "examiner calibration" => Section(MaterialsAndMethods),
    "clinical measurements" => Section(MaterialsAndMethods),
    "protocol registration number" => Section(MaterialsAndMethods),
    "protocol registration" => Section(MaterialsAndMethods),
    "screening of articles" => Section(MaterialsAndMethods),
    "bayesian meta-analysis" => Section(MaterialsAndMethods),
    "wound healing parameter evaluation" => Section(MaterialsAndMethods),
    "study and control samples" => Section(MaterialsAndMethods),
    "research systematics" => Section(MaterialsAndMethods),
    "gcf collection" => Section(MaterialsAndMethods),
    "levelling and alignment" => Section(MaterialsAndMethods),
    "surgical procedure" => Section(MaterialsAndMethods),
    "biochemical analysis" => Section(MaterialsAndMethods),
    "fe model creation" => Section(MaterialsAndMethods),
    "loading procedure" => Section(MaterialsAndMethods),
    "experimental setup" => Section(MaterialsAndMethods),
    "morphological surface and cross-sectional analysis" => Section(MaterialsAndMethods),
    "compositional analysis" => Section(MaterialsAndMethods),
    "functional group analysis" => Section(MaterialsAndMethods),
    "ph analysis" => Section(MaterialsAndMethods),
    "calcium ion release" => Section(MaterialsAndMethods),
    "preparation of bis-gma and tegdma composites" => Section(MaterialsAndMethods),
    "material testing conditions" => Section(MaterialsAndMethods),
    "flexural properties" => Section(MaterialsAndMethods),
    "compressive strength" => Section(MaterialsAndMethods),
    "scanning electron microscopy" => Section(MaterialsAndMethods),
    "calcium (ca 2+ ) and phosphate (po4 3-) release" => Section(MaterialsAndMethods),
    "cell cytotoxicity" => Section(MaterialsAndMethods),
    "mechanical performance 1. flexural strength" => Section(MaterialsAndMethods),
    "evaluation of surface roughness" => Section(MaterialsAndMethods),
    "periapical image processing" => Section(MaterialsAndMethods),
    "analysis of periapical images by ai model" => Section(MaterialsAndMethods),
    "information sources" => Section(MaterialsAndMethods),
    "intervention (i)" => Section(MaterialsAndMethods),
    "comparator or control group (c)" => Section(MaterialsAndMethods),
    "outcomes (o)" => Section(MaterialsAndMethods),
    "study design (s)" => Section(MaterialsAndMethods),
    "selection of studies" => Section(MaterialsAndMethods),
    "patient selection" => Section(MaterialsAndMethods),
    "vacuum plasma surface treatment" => Section(MaterialsAndMethods),
    "predictor and outcome variables" => Section(MaterialsAndMethods),
    "design and data collection" => Section(MaterialsAndMethods),
    "measures" => Section(MaterialsAndMethods),
    "the design of the questionnaire" => Section(MaterialsAndMethods),
    "the studied group" => Section(MaterialsAndMethods),
    "research protocol and search queries" => Section(MaterialsAndMethods),
    // Boilerplate, recognized so it can be excluded from the body record
    "acknowledgements" => NonContent("acknowledgements"),
    "acknowledgments" => NonContent("acknowledgments"),
    "funding" => NonContent("funding"),
    "conflict of interest" => NonContent("conflict_of_interest"),
    "conflicts of interest" => NonContent("conflicts_of_interest"),
    "competing interests" => NonContent("competing_interests"),
    "authors' contributions" => NonContent("author_contributions"),
    "author contributions" => NonContent("author_contributions"),
    "contributorship" => NonContent("contributorship"),
    "availability of data and materials" => NonContent("availability_of_data_and_materials"),
    "data availability" => NonContent("data_availability"),
    "ethical statement" => NonContent("ethical_statement"),
    "ethics statement" => NonContent("ethics_statement"),
    "human and animal rights" => NonContent("human_and_animal_rights"),
    "patient consent" => NonContent("patient_consent"),
    "consent for publication" => NonContent("consent_for_publication"),
    "list of abbreviations" => NonContent("list_of_abbreviations"),
    "abbreviations" => NonContent("abbreviations"),
    "orcid" => NonContent("orcid"),
    "references" => NonContent("references"),
    "bibliography" => NonContent("bibliography"),
};

/// Method-family substring cues, tried after exact and prefix matching.
const METHOD_CUES: &[&str] = &[
    "method",
    "methodology",
    "statistic",
    "power analysis",
    "sample size",
    "eligibility",
    "inclusion",
    "exclusion",
    "sample preparation",
    "specimen preparation",
    "participants",
    "population",
    "search strategy",
    "study selection",
    "data extraction",
    "quality assessment",
    "methodological quality",
    "risk of bias",
    "preoperative",
    "indication",
    "contraindication",
    "systemic condition",
    "local condition",
    "outcome measure",
    "randomization",
    "blinding",
    "charting",
    "synthesis",
];

const INTRO_CUES: &[&str] = &["introduc", "aim", "objective", "purpose", "background"];

const CONCLUSION_CUES: &[&str] = &["conclusion", "clinical significance"];

const DISCUSSION_CUES: &[&str] = &["discussion", "limitation"];

lazy_static! {
    /// Leading pipes, bullets, dashes, and quote glyphs.
    static ref LEADING_JUNK: Regex = Regex::new(r"^[|>•\-\u{2013}\u{2014}\s]+").unwrap();
    /// Leading numbering: "1.", "3.2.", "ii.", with trailing separators.
    static ref NUMBERING: Regex =
        Regex::new(r"^(?:[ivxlcdm]+\.|\d+(?:\.\d+)*\.?)[\s\-:]*").unwrap();
    /// Space-removed view of the exact table, for artificially spaced
    /// headings ("R e s u l t s", "ResultsandDiscussion").
    static ref EXACT_SPACELESS: HashMap<String, CanonicalKey> = EXACT
        .entries()
        .map(|(k, v)| (k.replace(' ', ""), *v))
        .collect();
    /// Exact keys ordered longest-first so composite keys are tested
    /// before any single-word key that prefixes them.
    static ref PREFIX_ORDER: Vec<(&'static str, CanonicalKey)> = {
        let mut keys: Vec<_> = EXACT.entries().map(|(k, v)| (*k, *v)).collect();
        keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
        keys
    };
}

/// Normalize a raw heading for table lookup: strip accents, case-fold,
/// drop leading bullets/numbering, fold `&` and `/` to "and", collapse
/// whitespace.
pub fn sanitize_heading(raw: &str) -> String {
    let stripped: String = raw
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .replace('&', " and ")
        .replace('/', " and ");
    let s = norm_ws(&stripped);
    let s = LEADING_JUNK.replace(&s, "");
    let s = NUMBERING.replace(&s, "");
    norm_ws(&s)
}

/// Map a heading to a canonical key, or `None` when it is unmapped.
///
/// A heading containing both "results" and "discussion" always resolves
/// to the composite key, never to `Results` alone.
pub fn canonicalize(heading: &str) -> Option<CanonicalKey> {
    let n = sanitize_heading(heading);
    if n.is_empty() {
        return None;
    }

    // Exact match, then the space-removed variant
    if let Some(key) = EXACT.get(n.as_str()) {
        return Some(*key);
    }
    let spaceless = n.replace(' ', "");
    if let Some(key) = EXACT_SPACELESS.get(spaceless.as_str()) {
        return Some(*key);
    }

    // Composite guard: must outrank any prefix or single-cue match
    if spaceless.contains("results") && spaceless.contains("discussion") {
        return Some(Section(ResultsAndDiscussion));
    }

    // Prefix match against known variants ("introduction and objectives")
    for (key, value) in PREFIX_ORDER.iter() {
        if let Some(rest) = n.strip_prefix(key)
            && rest.starts_with(' ')
        {
            return Some(*value);
        }
    }

    // Ordered keyword families
    if METHOD_CUES.iter().any(|cue| n.contains(cue)) {
        return Some(Section(MaterialsAndMethods));
    }
    if INTRO_CUES.iter().any(|cue| n.contains(cue)) {
        return Some(Section(Introduction));
    }
    if CONCLUSION_CUES.iter().any(|cue| n.contains(cue)) {
        return Some(Section(Conclusions));
    }
    if n.contains("result") {
        return Some(Section(Results));
    }
    if DISCUSSION_CUES.iter().any(|cue| n.contains(cue)) {
        return Some(Section(Discussion));
    }

    None
}

/// True when the heading canonicalizes to exactly this content key.
pub fn is_heading_of(heading: &str, key: SectionKey) -> bool {
    canonicalize(heading) == Some(Section(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_heading_sanitizes() {
        assert_eq!(sanitize_heading("3.2 Materials And Methods"), "materials and methods");
        assert_eq!(sanitize_heading("II. RESULTS"), "results");
        assert_eq!(sanitize_heading("| Clinical Examinations"), "clinical examinations");
    }

    #[test]
    fn test_accents_and_ampersand_fold() {
        assert_eq!(sanitize_heading("Matériels & Méthodes"), "materiels and methodes");
        assert_eq!(
            canonicalize("Materials & Methods"),
            Some(Section(MaterialsAndMethods))
        );
    }

    #[test]
    fn test_scenario_a_numbered_methods() {
        assert_eq!(
            canonicalize("3.2 Materials And Methods"),
            Some(Section(MaterialsAndMethods))
        );
    }

    #[test]
    fn test_core_synonyms() {
        assert_eq!(canonicalize("Background"), Some(Section(Introduction)));
        assert_eq!(canonicalize("Limitations"), Some(Section(Discussion)));
        assert_eq!(canonicalize("Clinical Significance"), Some(Section(Conclusions)));
        assert_eq!(canonicalize("Statistical analysis"), Some(Section(MaterialsAndMethods)));
    }

    #[test]
    fn test_composite_beats_single() {
        for heading in [
            "Results and Discussion",
            "RESULTS AND DISCUSSION",
            "3. Results & Discussion",
            "Discussion of Results",
            "ResultsandDiscussion",
            "R e s u l t s and D i s c u s s i o n",
        ] {
            assert_eq!(
                canonicalize(heading),
                Some(Section(ResultsAndDiscussion)),
                "heading: {heading:?}"
            );
        }
    }

    #[test]
    fn test_prefix_variants() {
        assert_eq!(
            canonicalize("Introduction and Objectives"),
            Some(Section(Introduction))
        );
        assert_eq!(canonicalize("Results of the survey"), Some(Section(Results)));
    }

    #[test]
    fn test_non_content_recognized() {
        assert_eq!(canonicalize("Funding"), Some(NonContent("funding")));
        assert_eq!(
            canonicalize("Acknowledgements"),
            Some(NonContent("acknowledgements"))
        );
        assert!(canonicalize("Funding").unwrap().is_non_content());
    }

    #[test]
    fn test_idiosyncratic_heading_unmapped() {
        assert_eq!(canonicalize("Epidemiology of benign oesophageal strictures"), None);
    }

    #[test]
    fn test_idempotent_under_own_normalization() {
        for heading in ["3.2 Materials And Methods", "| Résults", "Background"] {
            let sanitized = sanitize_heading(heading);
            assert_eq!(canonicalize(&sanitized), canonicalize(heading));
        }
    }

    #[test]
    fn test_empty_heading() {
        assert_eq!(canonicalize(""), None);
        assert_eq!(canonicalize("  12.  "), None);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_canonicalize_ignores_case_and_numbering(
            prefix in prop_oneof![
                Just(String::new()),
                Just("3. ".to_string()),
                Just("IV. ".to_string()),
                Just("2.1.3 ".to_string()),
                Just("| ".to_string()),
            ],
            upper in any::<bool>(),
        ) {
            for base in ["Introduction", "Materials and Methods", "Results and Discussion"] {
                let heading = if upper {
                    format!("{prefix}{}", base.to_uppercase())
                } else {
                    format!("{prefix}{base}")
                };
                prop_assert_eq!(canonicalize(&heading), canonicalize(base));
            }
        }

        #[test]
        fn prop_sanitize_output_is_normalized(s in "\\PC{0,40}") {
            let out = sanitize_heading(&s);
            prop_assert!(!out.chars().any(|c| c.is_uppercase()));
            prop_assert!(!out.contains('&') && !out.contains('/'));
            prop_assert!(!out.contains("  "));
            prop_assert_eq!(out.trim(), out.as_str());
        }

        #[test]
        fn prop_composite_never_collapses_to_single_key(
            sep in prop_oneof![Just(" and "), Just(" & "), Just(" / ")],
            swap in any::<bool>(),
        ) {
            let heading = if swap {
                format!("Discussion{sep}Results")
            } else {
                format!("Results{sep}Discussion")
            };
            prop_assert_eq!(
                canonicalize(&heading),
                Some(Section(ResultsAndDiscussion))
            );
        }
    }
}
