//! Core data models shared by the highlighter and the extraction store.
//!
//! These types describe what a character of a source file was used for
//! ([`Usage`], [`Char`]), the record handed to the storage layer for every
//! extracted value ([`ExtractedToken`]), and the per-tool switch that decides
//! how much of that work is done ([`HighlightLevel`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One fact: "this character contributed to an extracted value".
///
/// `tool_field` is `"<tool>/<field>"`, or the bare field label when a whole
/// line is recorded without a tool. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub tool_field: String,
    pub message: String,
}

impl Usage {
    pub fn new(tool_field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_field: tool_field.into(),
            message: message.into(),
        }
    }
}

/// A single decoded character of a source file plus every usage recorded
/// against it, in recording order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Char {
    pub letter: char,
    pub usages: Vec<Usage>,
}

impl Char {
    pub fn new(letter: char) -> Self {
        Self {
            letter,
            usages: Vec::new(),
        }
    }
}

/// Build one [`Char`] per decoded character of `text`.
pub fn chars_from_text(text: &str) -> Vec<Char> {
    text.chars().map(Char::new).collect()
}

/// Build the usage message for an interpreted value.
///
/// `"Value:<value>"`, or `"Value:<value> Units:<units>"` when units are given.
pub fn usage_message(value: &str, units: Option<&str>) -> String {
    match units {
        Some(units) => format!("Value:{} Units:{}", value, units),
        None => format!("Value:{}", value),
    }
}

/// Provenance record appended to a datafile's pending list by `record`.
///
/// `text_location` is the merged absolute character ranges rendered as
/// comma-joined `low-high` pairs, e.g. `"0-6,7-17"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedToken {
    pub text: String,
    pub interpreted_value: String,
    pub text_location: String,
    pub importer: String,
    pub field: String,
}

/// The stored row an object was created from, used to key flushed tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasurementRef {
    /// Destination table of the measurement (e.g. `"States"`).
    pub table: String,
    /// Identifier of the row within that table.
    pub entry_id: String,
}

impl MeasurementRef {
    pub fn new(table: impl Into<String>, entry_id: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            entry_id: entry_id.into(),
        }
    }
}

/// How much highlighting work is done for a given tool.
///
/// | Level | Stamps characters | Appends extraction records |
/// |-------|-------------------|----------------------------|
/// | [`Disabled`](HighlightLevel::Disabled) | no | no |
/// | [`RenderOnly`](HighlightLevel::RenderOnly) | yes | no |
/// | [`PersistAndRender`](HighlightLevel::PersistAndRender) | yes | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HighlightLevel {
    #[serde(rename = "none")]
    Disabled,
    #[default]
    #[serde(rename = "html")]
    RenderOnly,
    #[serde(rename = "database")]
    PersistAndRender,
}

impl HighlightLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightLevel::Disabled => "none",
            HighlightLevel::RenderOnly => "html",
            HighlightLevel::PersistAndRender => "database",
        }
    }
}

impl fmt::Display for HighlightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(HighlightLevel::Disabled),
            "html" => Ok(HighlightLevel::RenderOnly),
            "database" => Ok(HighlightLevel::PersistAndRender),
            other => Err(format!(
                "unknown highlighting level '{}': must be none, html, or database",
                other
            )),
        }
    }
}
