//! End-to-end slicing tests over a complete TEI document, covering
//! section canonicalization, combined-section backfill, media location,
//! structured references, metadata, and the journal override layer.

use teislice::{MediaKind, SectionKey, Tei, slice};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture(name: &str) -> Tei {
    let path = format!("{}/{}", FIXTURES_DIR, name);
    let xml = std::fs::read_to_string(&path).expect("Failed to read fixture");
    Tei::parse(&xml).expect("Failed to parse fixture")
}

// ============================================================================
// Sections
// ============================================================================

#[test]
fn test_all_canonical_sections_recovered() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));

    let abstract_text = rec.section(SectionKey::Abstract).expect("abstract");
    assert!(abstract_text.starts_with("Monolithic zirconia restorations"));
    assert_eq!(rec.section_provenance[&SectionKey::Abstract], "header");

    let intro = rec.section(SectionKey::Introduction).expect("introduction");
    assert!(intro.contains("displaced metal-ceramic crowns"));
    assert!(!intro.contains("[1]"), "citation markers must be stripped");

    let methods = rec.section(SectionKey::MaterialsAndMethods).expect("methods");
    assert!(methods.contains("Forty zirconia discs"));
    assert!(methods.contains("120,000 cycles"));
    // Paragraphs join with a blank line
    assert!(methods.contains("\n\n"));

    let conclusions = rec.section(SectionKey::Conclusions).expect("conclusions");
    assert!(conclusions.contains("polishing is preferable"));
}

#[test]
fn test_combined_section_backfills_results_and_discussion() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));

    let combined = rec.section(SectionKey::ResultsAndDiscussion).expect("combined");
    assert_eq!(rec.section(SectionKey::Results), Some(combined));
    assert_eq!(rec.section(SectionKey::Discussion), Some(combined));
    assert_eq!(rec.section_provenance[&SectionKey::Results], "results_and_discussion");
    assert_eq!(rec.section_provenance[&SectionKey::Discussion], "results_and_discussion");
}

#[test]
fn test_headings_never_leak_into_section_text() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));
    for (key, text) in &rec.sections {
        assert!(
            !text.contains("Material and Methods") && !text.contains("Conclusions"),
            "heading text leaked into {key:?}"
        );
    }
}

#[test]
fn test_unmapped_and_non_content_sections_preserved() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));

    let topical = &rec.other_sections["wear mechanisms of zirconia"];
    assert!(topical.contains("adhesive wear tracks"));

    let acks = &rec.other_sections["acknowledgements"];
    assert!(acks.contains("ceramics laboratory staff"));
    assert!(
        !rec.sections.values().any(|t| t.contains("ceramics laboratory")),
        "acknowledgements must not enter canonical sections"
    );
}

// ============================================================================
// Media
// ============================================================================

#[test]
fn test_figure_label_normalized_against_caption() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));
    assert_eq!(rec.figures.len(), 1);
    let fig = &rec.figures[0];
    // Raw n="51" is corrupt; the head text wins
    assert_eq!(fig.label.as_deref(), Some("Figure 1"));
    assert_eq!(fig.caption.as_deref(), Some("Mean wear volumes per group after 120,000 cycles."));
    assert_eq!(fig.page, 4);
    assert_eq!(fig.bbox, Some([56.2, 120.0, 290.8, 305.5]));
}

#[test]
fn test_tables_from_nodes_and_running_text() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));
    let labels: Vec<_> = rec.tables.iter().filter_map(|t| t.label.as_deref()).collect();
    assert_eq!(labels, vec!["Table 1", "Table 2"]);

    let synthesized = rec.tables.iter().find(|t| t.provenance == "tei-ref").unwrap();
    assert_eq!(
        synthesized.caption.as_deref(),
        Some("wear volumes and standard deviations per group.")
    );
    assert_eq!(rec.tables[0].kind, MediaKind::Table);
}

// ============================================================================
// References and metadata
// ============================================================================

#[test]
fn test_structured_references() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));
    assert_eq!(rec.references.len(), 2);
    let first = &rec.references[0];
    assert_eq!(first.provenance, "structured");
    assert_eq!(first.title.as_deref(), Some("Wear of ceramic and antagonist enamel"));
    assert_eq!(first.journal.as_deref(), Some("J Dent Res"));
    assert_eq!(first.doi.as_deref(), Some("10.1177/0022034511402500"));
    assert_eq!(first.pages.as_deref(), Some("1158-1162"));
    assert!(rec.references[1].doi.is_none());
}

#[test]
fn test_metadata_fields() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));
    assert_eq!(
        rec.meta.title.as_deref(),
        Some("Influence of surface treatment on zirconia wear: an in vitro study")
    );
    assert_eq!(rec.meta.journal.as_deref(), Some("Dental Materials"));
    assert_eq!(rec.meta.date.as_deref(), Some("2022-04-01"));
    assert_eq!(rec.meta.doi.as_deref(), Some("10.1016/j.dental.2022.03.004"));
    assert_eq!(rec.meta.keywords, vec!["zirconia", "wear", "surface treatment"]);
    assert_eq!(rec.meta.authors.len(), 2);
    assert_eq!(
        rec.meta.authors[0].affiliations,
        vec!["Department of Dentistry, University of Lisbon, Lisbon, Portugal"]
    );
}

#[test]
fn test_record_serializes_to_json() {
    let rec = slice(&fixture("zirconia_wear.tei.xml"));
    let json = serde_json::to_string(&rec).expect("record must serialize");
    assert!(json.contains("\"materials_and_methods\""));
    assert!(json.contains("\"Figure 1\""));
}

// ============================================================================
// Degenerate inputs
// ============================================================================

#[test]
fn test_abstract_only_document_with_inline_labels() {
    let doc = Tei::parse(
        r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><profileDesc><abstract>
            <p>Objectives: compare shear bond strength of two cements. Methods: sixty specimens were bonded and thermocycled. Results: resin cement outperformed glass ionomer. Conclusions: cement choice matters clinically.</p>
        </abstract></profileDesc></teiHeader><text><body/></text></TEI>"#,
    )
    .unwrap();
    let rec = slice(&doc);
    assert!(rec.section(SectionKey::Results).unwrap().contains("resin cement outperformed"));
    assert_eq!(rec.section_provenance[&SectionKey::Results], "abstract-inline");
    assert!(rec.section(SectionKey::Conclusions).unwrap().contains("cement choice matters"));
}

#[test]
fn test_review_article_gets_aggregated_discussion() {
    let doc = Tei::parse(
        r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><fileDesc>
            <titleStmt><title>Peri-implantitis therapies: a systematic review</title></titleStmt>
        </fileDesc></teiHeader><text><body>
            <div><head>Introduction</head><p>Why this review was done.</p></div>
            <div><head>Search strategy</head><p>PubMed and Embase were searched.</p></div>
            <div><head>Mechanical debridement</head><p>Curettes alone rarely resolve inflammation.</p></div>
            <div><head>Adjunctive antimicrobials</head><p>Local antibiotics add modest benefit.</p></div>
        </body></text></TEI>"#,
    )
    .unwrap();
    let rec = slice(&doc);

    // Search strategy folds into methods, topical sections into discussion
    assert!(
        rec.section(SectionKey::MaterialsAndMethods)
            .unwrap()
            .contains("PubMed and Embase")
    );
    let disc = rec.section(SectionKey::Discussion).unwrap();
    assert!(disc.contains("Curettes alone"));
    assert!(disc.contains("Local antibiotics"));
    assert!(!disc.contains("Why this review was done"));
}

#[test]
fn test_malformed_markup_still_slices() {
    // Unclosed div and stray end tag
    let doc = Tei::parse(
        r#"<TEI><text><body>
            <div><head>Introduction</head><p>Short intro text.</p></extra>
            <div><head>Conclusions</head><p>Short closing text.</p></div>
        </body></text></TEI>"#,
    )
    .unwrap();
    let rec = slice(&doc);
    assert!(rec.section(SectionKey::Introduction).unwrap().contains("Short intro text"));
    assert!(rec.section(SectionKey::Conclusions).unwrap().contains("Short closing text"));
}
