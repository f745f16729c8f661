//! # teislice
//!
//! A library for slicing imperfect TEI XML of scientific papers, as
//! produced by PDF structuring services, into a canonical record:
//! named sections with cleaned text, figures and tables with labels
//! and page coordinates, references, and header metadata.
//!
//! ## Quick Start
//!
//! ```no_run
//! use teislice::{Tei, SectionKey, slice};
//!
//! let xml = std::fs::read_to_string("paper.tei.xml").unwrap();
//! let doc = Tei::parse(&xml).unwrap();
//! let record = slice(&doc);
//!
//! if let Some(methods) = record.section(SectionKey::MaterialsAndMethods) {
//!     println!("{methods}");
//! }
//! for figure in &record.figures {
//!     println!("{:?}: {:?}", figure.label, figure.caption);
//! }
//! ```
//!
//! ## How sections are found
//!
//! Headings are canonicalized through a synonym table plus prefix and
//! cue matching ([`canonicalize`]), and each canonical section is
//! extracted by a chain of strategies: explicit `type` attributes,
//! heading matches, multi-division aggregation, and abstract-scoped
//! fallbacks for abstract-only documents. Unrecognized headings are
//! never dropped; they land in
//! [`PaperRecord::other_sections`](record::PaperRecord::other_sections).
//! A final journal-aware pass adjusts records for publication styles
//! that defeat the generic rules.

pub mod clean;
pub mod error;
pub mod extract;
pub(crate) mod journals;
pub mod mapping;
pub mod media;
pub mod meta;
pub(crate) mod reader;
pub mod record;
pub mod refs;
pub mod tree;
pub(crate) mod util;

pub use clean::{clean_subtree, scrub_text};
pub use error::{Error, Result};
pub use extract::{Extracted, extract, extract_aggregate, slice};
pub use mapping::{CanonicalKey, SectionKey, canonicalize, is_heading_of, sanitize_heading};
pub use media::{MediaItem, MediaKind, locate};
pub use meta::{Author, Meta, extract_meta};
pub use record::PaperRecord;
pub use refs::{
    RefAuthor, ReferenceEntry, format_reference, format_references_list, norm_doi,
    parse_references,
};
pub use tree::{NodeId, Tei};
