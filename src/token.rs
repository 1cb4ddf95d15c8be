//! Lines, tokens and the sub-spans they are made of.
//!
//! A [`SubToken`] is one contiguous character span of the source. A
//! [`Line`] or [`Token`] is an ordered list of sub-spans sharing one
//! [`HighlightedFile`]; recording against either stamps a [`Usage`] onto
//! every character it covers.

use std::fmt::Display;
use std::rc::Rc;

use tracklight_core::merge::{format_text_location, merge_adjacent_text_locations};
use tracklight_core::models::{usage_message, ExtractedToken, HighlightLevel, Usage};

use crate::error::Result;
use crate::highlighter::HighlightedFile;
use crate::tokenize::{self, Grammar};

/// One contiguous span of characters.
///
/// `span` is relative to the start of the line the sub-span was cut from;
/// `line_start` is that line's absolute character index in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubToken {
    span: (usize, usize),
    text: String,
    line_start: usize,
}

impl SubToken {
    pub fn new(span: (usize, usize), text: impl Into<String>, line_start: usize) -> Self {
        Self {
            span,
            text: text.into(),
            line_start,
        }
    }

    /// Absolute start index in the file.
    pub fn start(&self) -> usize {
        self.line_start + self.span.0
    }

    /// Absolute end index in the file (exclusive).
    pub fn end(&self) -> usize {
        self.line_start + self.span.1
    }

    pub fn span(&self) -> (usize, usize) {
        self.span
    }

    pub fn line_start(&self) -> usize {
        self.line_start
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Anything made of sub-spans over one file: a [`Line`] or a [`Token`].
pub trait SpanGroup {
    fn children(&self) -> &[SubToken];

    fn highlighted_file(&self) -> &Rc<HighlightedFile>;

    /// Sub-span texts concatenated in order.
    fn text(&self) -> String {
        self.children().iter().map(SubToken::text).collect()
    }

    /// Absolute start of the first sub-span.
    fn start(&self) -> Option<usize> {
        self.children().first().map(SubToken::start)
    }

    /// Absolute end of the last sub-span.
    fn end(&self) -> Option<usize> {
        self.children().last().map(SubToken::end)
    }
}

fn stamp(file: &HighlightedFile, children: &[SubToken], usage: &Usage) {
    for child in children {
        file.set_usages_for_slice(child.start(), child.end(), usage);
    }
}

fn text_location(children: &[SubToken]) -> String {
    let ranges: Vec<(usize, usize)> = children.iter().map(|c| (c.start(), c.end())).collect();
    format_text_location(&merge_adjacent_text_locations(&ranges))
}

/// Level-gated recording shared by lines and tokens.
///
/// `none` does nothing, not even materialising the store. `html` stamps the
/// characters. `database` also appends an [`ExtractedToken`] to the
/// attached datafile.
fn record_tool_usage(
    group: &dyn SpanGroup,
    tool: &str,
    field: &str,
    value: &str,
    units: Option<&str>,
) -> Result<()> {
    let file = group.highlighted_file();
    let level = file.level_for(tool);
    if level == HighlightLevel::Disabled {
        return Ok(());
    }
    if level == HighlightLevel::PersistAndRender {
        file.require_datafile(tool)?;
    }
    file.materialize()?;

    let usage = Usage::new(format!("{}/{}", tool, field), usage_message(value, units));
    stamp(file, group.children(), &usage);

    if level == HighlightLevel::PersistAndRender {
        file.push_extracted_token(ExtractedToken {
            text: group.text(),
            interpreted_value: value.to_string(),
            text_location: text_location(group.children()),
            importer: tool.to_string(),
            field: field.to_string(),
        })?;
    }
    Ok(())
}

/// A value-bearing run of one or more sub-spans.
#[derive(Debug, Clone)]
pub struct Token {
    children: Vec<SubToken>,
    file: Rc<HighlightedFile>,
}

impl Token {
    pub fn new(children: Vec<SubToken>, file: Rc<HighlightedFile>) -> Self {
        Self { children, file }
    }

    /// Record that `tool` interpreted this token as `value` for `field`.
    pub fn record(
        &self,
        tool: &str,
        field: &str,
        value: impl Display,
        units: Option<&str>,
    ) -> Result<()> {
        record_tool_usage(self, tool, field, &value.to_string(), units)
    }
}

impl SpanGroup for Token {
    fn children(&self) -> &[SubToken] {
        &self.children
    }

    fn highlighted_file(&self) -> &Rc<HighlightedFile> {
        &self.file
    }
}

/// One physical line of a file.
#[derive(Debug, Clone)]
pub struct Line {
    children: Vec<SubToken>,
    file: Rc<HighlightedFile>,
}

impl Line {
    pub fn new(children: Vec<SubToken>, file: Rc<HighlightedFile>) -> Self {
        Self { children, file }
    }

    /// Split the line with `grammar`.
    ///
    /// With `strip_char`, a leading occurrence of that character is dropped
    /// from each match and the remainder trimmed of whitespace. The first
    /// quoted run on the line is kept whole: matches lying inside it are
    /// replaced by one token holding the trimmed quoted content.
    pub fn tokens(&self, grammar: &Grammar, strip_char: Option<char>) -> Vec<Token> {
        self.children
            .iter()
            .flat_map(|child| tokenize::split_sub_token(child, grammar, strip_char))
            .map(|sub| Token::new(vec![sub], Rc::clone(&self.file)))
            .collect()
    }

    /// Whitespace-delimited tokens, no strip character.
    pub fn whitespace_tokens(&self) -> Vec<Token> {
        self.tokens(&Grammar::Whitespace, None)
    }

    /// Comma-separated tokens with the leading comma stripped.
    pub fn csv_tokens(&self) -> Vec<Token> {
        self.tokens(&Grammar::Csv, Grammar::Csv.default_strip_char())
    }

    /// Record the whole line on behalf of `tool`, gated by its level.
    pub fn record(
        &self,
        tool: &str,
        field: &str,
        value: impl Display,
        units: Option<&str>,
    ) -> Result<()> {
        record_tool_usage(self, tool, field, &value.to_string(), units)
    }

    /// Record the whole line without a tool.
    ///
    /// Always stamps, under the bare `field` key. Appends an extraction with
    /// an empty importer when a datafile is attached.
    pub fn record_field(&self, field: &str, value: impl Display, units: Option<&str>) -> Result<()> {
        let value = value.to_string();
        self.file.materialize()?;
        let usage = Usage::new(field, usage_message(&value, units));
        stamp(&self.file, &self.children, &usage);

        if self.file.datafile().is_some() {
            self.file.push_extracted_token(ExtractedToken {
                text: self.text(),
                interpreted_value: value,
                text_location: text_location(&self.children),
                importer: String::new(),
                field: field.to_string(),
            })?;
        }
        Ok(())
    }
}

impl SpanGroup for Line {
    fn children(&self) -> &[SubToken] {
        &self.children
    }

    fn highlighted_file(&self) -> &Rc<HighlightedFile> {
        &self.file
    }
}

/// Single-line [`Line`] over its own in-memory file, for importer tests.
pub fn create_test_line(text: &str) -> Line {
    let file = HighlightedFile::from_text(text);
    let len = text.chars().count();
    Line::new(vec![SubToken::new((0, len), text, 0)], file)
}
