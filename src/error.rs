//! Error type for the highlighter library.
use thiserror::Error;

/// Errors raised while loading, tokenizing, parsing or recording.
///
/// Configuration errors are user-facing; the contract errors
/// (`NoHighlightedFile`, `InvalidXmlPart`, `EmptyCombine`, `NoDatafile`)
/// indicate a programming mistake in the calling importer.
#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No highlighted file is associated with this XML element")]
    NoHighlightedFile,

    #[error("Invalid xml_part '{0}': must be one of 'text', 'opening', 'all'")]
    InvalidXmlPart(String),

    #[error("Cannot combine zero tokens")]
    EmptyCombine,

    #[error("Tool '{0}' records extractions but no datafile is attached")]
    NoDatafile(String),

    #[error("Characters {start}-{end} lie past the {len} loaded characters (is a line limit set?)")]
    OutsideStore { start: usize, end: usize, len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML end tag mismatch: expected </{expected}>, found </{found}>")]
    MismatchedEndTag { expected: String, found: String },

    #[error("XML document ended with {0} unclosed element(s)")]
    UnclosedElements(usize),

    #[error("XML document has no root element")]
    NoRootElement,
}

impl From<std::str::Utf8Error> for HighlightError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::Encoding(value.to_string())
    }
}

impl From<std::string::FromUtf8Error> for HighlightError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        Self::Encoding(value.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for HighlightError {
    fn from(value: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(value.into())
    }
}

pub type Result<T> = std::result::Result<T, HighlightError>;
