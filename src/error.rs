//! Error types for teislice operations.

use thiserror::Error;

/// Errors that can occur while parsing an input document.
///
/// Downstream of a successful parse, the crate is infallible: a section
/// that no strategy can locate is `None`, ambiguous coordinates become a
/// `None` bounding box, and reference parsing degrades to heuristics.
#[derive(Error, Debug)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed input: {0}")]
    MalformedInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
