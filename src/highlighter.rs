//! Character-addressable view of one source file.
//!
//! A [`HighlightedFile`] is the character store behind every [`Line`],
//! [`Token`] and XML element cut from a file. It splits the file into lines
//! on demand, lazily builds one [`Char`] cell per decoded character the
//! first time anything is recorded, and owns the colour cache used when the
//! annotated file is exported as HTML.
//!
//! All lines and tokens of a file share one `Rc<HighlightedFile>`; recording
//! mutates the character array in place through a `RefCell`. Nothing here is
//! `Send`: one import pipeline owns one file.
//!
//! ```text
//! HighlightedFile ──lines()──▶ Line ──tokens()──▶ Token ──record()──┐
//!        ▲                                                          │
//!        └──────────── stamps Char::usages, appends ExtractedToken ◀┘
//! ```

use std::cell::{Cell, OnceCell, Ref, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracklight_core::color::ColorCache;
use tracklight_core::level::{LevelLookup, LevelRegistry};
use tracklight_core::models::{chars_from_text, Char, ExtractedToken, HighlightLevel, Usage};

use crate::datafile::Datafile;
use crate::error::{HighlightError, Result};
use crate::export::{self, ExportTarget, LocalTarget};
use crate::token::{Line, SubToken};

enum Source {
    Path(PathBuf),
    Inline,
}

/// One physical line of the source, located in both byte and char space.
#[derive(Debug, Clone, Copy)]
struct PhysicalLine<'a> {
    char_start: usize,
    byte_start: usize,
    text: &'a str,
}

/// Split on `\n`, dropping a trailing `\r`. A final terminator does not
/// start an extra empty line.
fn physical_lines(text: &str) -> Vec<PhysicalLine<'_>> {
    let mut lines = Vec::new();
    let mut char_start = 0;
    let mut byte_start = 0;
    for piece in text.split_inclusive('\n') {
        let content = piece.strip_suffix('\n').unwrap_or(piece);
        let content = content.strip_suffix('\r').unwrap_or(content);
        lines.push(PhysicalLine {
            char_start,
            byte_start,
            text: content,
        });
        char_start += piece.chars().count();
        byte_start += piece.len();
    }
    lines
}

/// Character store for one source file.
pub struct HighlightedFile {
    source: Source,
    text: OnceCell<String>,
    line_limit: Option<i64>,
    chars: RefCell<Vec<Char>>,
    materialized: Cell<bool>,
    levels: Box<dyn LevelLookup>,
    datafile: RefCell<Option<Rc<RefCell<Datafile>>>>,
    colors: RefCell<ColorCache>,
}

impl fmt::Debug for HighlightedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightedFile")
            .field("path", &self.path())
            .field("line_limit", &self.line_limit)
            .field("materialized", &self.materialized.get())
            .field("chars", &self.chars.borrow().len())
            .finish()
    }
}

/// Builder for [`HighlightedFile`].
pub struct HighlightedFileBuilder {
    source: Source,
    text: Option<String>,
    line_limit: Option<i64>,
    levels: Box<dyn LevelLookup>,
    datafile: Option<Rc<RefCell<Datafile>>>,
    colors: ColorCache,
}

impl HighlightedFileBuilder {
    /// Only the first `limit` lines are produced and materialised.
    /// Validated lazily: a non-positive limit fails on first use.
    pub fn line_limit(mut self, limit: i64) -> Self {
        self.line_limit = Some(limit);
        self
    }

    pub fn levels(mut self, levels: impl LevelLookup + 'static) -> Self {
        self.levels = Box::new(levels);
        self
    }

    pub fn datafile(mut self, datafile: Rc<RefCell<Datafile>>) -> Self {
        self.datafile = Some(datafile);
        self
    }

    pub fn colors(mut self, colors: ColorCache) -> Self {
        self.colors = colors;
        self
    }

    pub fn build(self) -> Rc<HighlightedFile> {
        let text = OnceCell::new();
        if let Some(t) = self.text {
            let _ = text.set(t);
        }
        Rc::new(HighlightedFile {
            source: self.source,
            text,
            line_limit: self.line_limit,
            chars: RefCell::new(Vec::new()),
            materialized: Cell::new(false),
            levels: self.levels,
            datafile: RefCell::new(self.datafile),
            colors: RefCell::new(self.colors),
        })
    }
}

impl HighlightedFile {
    /// Builder for a file on disk. Nothing is read until first use.
    pub fn builder(path: impl Into<PathBuf>) -> HighlightedFileBuilder {
        HighlightedFileBuilder {
            source: Source::Path(path.into()),
            text: None,
            line_limit: None,
            levels: Box::new(LevelRegistry::default()),
            datafile: None,
            colors: ColorCache::new(),
        }
    }

    /// Builder over in-memory text (tests, already-decoded payloads).
    pub fn builder_from_text(text: impl Into<String>) -> HighlightedFileBuilder {
        HighlightedFileBuilder {
            source: Source::Inline,
            text: Some(text.into()),
            line_limit: None,
            levels: Box::new(LevelRegistry::default()),
            datafile: None,
            colors: ColorCache::new(),
        }
    }

    /// File on disk with default levels and no line limit.
    pub fn open(path: impl Into<PathBuf>) -> Rc<Self> {
        Self::builder(path).build()
    }

    /// In-memory text with default levels and no line limit.
    pub fn from_text(text: impl Into<String>) -> Rc<Self> {
        Self::builder_from_text(text).build()
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::Path(p) => Some(p),
            Source::Inline => None,
        }
    }

    pub fn line_limit(&self) -> Option<i64> {
        self.line_limit
    }

    /// Full decoded text of the source, read from disk on first call.
    pub fn text(&self) -> Result<&str> {
        if let Some(text) = self.text.get() {
            return Ok(text);
        }
        let path = match &self.source {
            Source::Path(p) => p,
            Source::Inline => return Ok(self.text.get_or_init(String::new)),
        };
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| HighlightError::Encoding(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "loaded source file");
        Ok(self.text.get_or_init(|| text))
    }

    /// Raw UTF-8 bytes of the source, used for XML byte-offset translation.
    pub fn bytes(&self) -> Result<&[u8]> {
        Ok(self.text()?.as_bytes())
    }

    fn checked_limit(&self) -> Result<Option<usize>> {
        match self.line_limit {
            None => Ok(None),
            Some(n) if n <= 0 => Err(HighlightError::Configuration(format!(
                "Non-positive number of lines ({}). Please provide a positive number",
                n
            ))),
            Some(n) => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
        }
    }

    /// The text covered by the character store: the whole file, or the
    /// first N lines (without the final terminator) when limited.
    fn store_text(&self) -> Result<&str> {
        let text = self.text()?;
        let Some(limit) = self.checked_limit()? else {
            return Ok(text);
        };
        let lines = physical_lines(text);
        if limit >= lines.len() {
            return Ok(text);
        }
        let last = lines[limit - 1];
        Ok(&text[..last.byte_start + last.text.len()])
    }

    /// Split the file into [`Line`]s, honouring the line limit.
    ///
    /// Does not materialise the character array.
    pub fn lines(self: &Rc<Self>) -> Result<Vec<Line>> {
        let limit = self.checked_limit()?;
        let text = self.text()?;
        let mut physical = physical_lines(text);
        if let Some(limit) = limit {
            physical.truncate(limit);
        }
        tracing::debug!(count = physical.len(), limit = ?limit, "split source into lines");
        Ok(physical
            .into_iter()
            .map(|pl| {
                let len = pl.text.chars().count();
                let sub = SubToken::new((0, len), pl.text, pl.char_start);
                Line::new(vec![sub], Rc::clone(self))
            })
            .collect())
    }

    /// Build the character array. Idempotent: only the first call does work.
    pub fn materialize(&self) -> Result<()> {
        if self.materialized.get() {
            return Ok(());
        }
        let chars = chars_from_text(self.store_text()?);
        tracing::debug!(chars = chars.len(), "materialized character store");
        *self.chars.borrow_mut() = chars;
        self.materialized.set(true);
        Ok(())
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized.get()
    }

    /// Borrow the character array (empty until materialised).
    pub fn chars(&self) -> Ref<'_, Vec<Char>> {
        self.chars.borrow()
    }

    pub fn char_count(&self) -> usize {
        self.chars.borrow().len()
    }

    /// Stamp `usage` onto `chars[start..end]`, in order.
    ///
    /// The range is clamped to the store, which can be shorter than the file
    /// when a line limit is set. Returns the requested `(start, end)`.
    pub fn set_usages_for_slice(&self, start: usize, end: usize, usage: &Usage) -> (usize, usize) {
        let mut chars = self.chars.borrow_mut();
        let upper = end.min(chars.len());
        let lower = start.min(upper);
        for ch in &mut chars[lower..upper] {
            ch.usages.push(usage.clone());
        }
        (start, end)
    }

    /// Translate a byte range of the source into a character range.
    pub fn byte_range_to_chars(&self, start: usize, end: usize) -> Result<(usize, usize)> {
        let bytes = self.bytes()?;
        let head = bytes
            .get(..start)
            .ok_or_else(|| HighlightError::Encoding(format!("byte offset {} out of range", start)))?;
        let body = bytes.get(start..end).ok_or_else(|| {
            HighlightError::Encoding(format!("byte range {}..{} out of range", start, end))
        })?;
        let start_in_chars = std::str::from_utf8(head)?.chars().count();
        let end_in_chars = start_in_chars + std::str::from_utf8(body)?.chars().count();
        Ok((start_in_chars, end_in_chars))
    }

    pub fn level_for(&self, tool: &str) -> HighlightLevel {
        self.levels.level_for(tool)
    }

    pub fn attach_datafile(&self, datafile: Rc<RefCell<Datafile>>) {
        *self.datafile.borrow_mut() = Some(datafile);
    }

    pub fn datafile(&self) -> Option<Rc<RefCell<Datafile>>> {
        self.datafile.borrow().clone()
    }

    /// Append to the attached datafile's pending extracted tokens.
    pub(crate) fn push_extracted_token(&self, token: ExtractedToken) -> Result<()> {
        let datafile = self
            .datafile()
            .ok_or_else(|| HighlightError::NoDatafile(token.importer.clone()))?;
        datafile.borrow_mut().pending_extracted_tokens.push(token);
        Ok(())
    }

    /// Fail early when a persisting record has nowhere to go.
    pub(crate) fn require_datafile(&self, tool: &str) -> Result<()> {
        if self.datafile.borrow().is_some() {
            Ok(())
        } else {
            Err(HighlightError::NoDatafile(tool.to_string()))
        }
    }

    /// Colours assigned so far, keyed by `tool/field`.
    pub fn colors(&self) -> Ref<'_, ColorCache> {
        self.colors.borrow()
    }

    /// Export the annotated file as HTML to a local path.
    pub fn export(&self, filename: impl AsRef<Path>, include_key: bool) -> Result<()> {
        self.export_to(&LocalTarget, filename.as_ref(), include_key)
    }

    /// Export the annotated file as HTML through `target`.
    pub fn export_to(
        &self,
        target: &dyn ExportTarget,
        filename: &Path,
        include_key: bool,
    ) -> Result<()> {
        let chars = self.chars.borrow();
        let mut colors = self.colors.borrow_mut();
        export::export_report(target, filename, &chars, &mut colors, include_key)
    }
}
