//! XML parsing with byte-accurate element offsets.
//!
//! quick-xml reports the reader position before and after every event.
//! [`OffsetTreeBuilder`] turns that event stream into an element tree in
//! which every element knows where its opening tag starts and ends, where
//! its text starts, where its closing tag starts, and which line it starts
//! on. [`Element::record`] uses those offsets to stamp provenance onto the
//! matching characters of the [`HighlightedFile`].
//!
//! Offsets are byte offsets into the raw file. They are converted to
//! character indices only when recording.

use std::fmt::Display;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracklight_core::models::{usage_message, ExtractedToken, Usage};

use crate::error::{HighlightError, Result};
use crate::highlighter::HighlightedFile;

/// Which part of an element a record covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlPart {
    /// Text content only, up to the closing tag.
    Text,
    /// The opening tag including attributes.
    Opening,
    /// Opening tag through closing-tag start.
    All,
}

impl FromStr for XmlPart {
    type Err = HighlightError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(XmlPart::Text),
            "opening" => Ok(XmlPart::Opening),
            "all" => Ok(XmlPart::All),
            other => Err(HighlightError::InvalidXmlPart(other.to_string())),
        }
    }
}

/// A parsed element. Offsets are bytes into the source.
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub tag: String,
    pub local_name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub opening_tag_start: usize,
    pub opening_tag_end: usize,
    /// Start of the element's text, or `opening_tag_end` when it has none.
    pub text_start: usize,
    pub closing_tag_start: usize,
    /// 1-based line of the opening tag.
    pub line_number: usize,
    children: Vec<usize>,
    parent: Option<usize>,
}

/// Element under construction.
#[derive(Debug)]
struct PendingNode {
    tag: String,
    local_name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    tail: Option<String>,
    opening_tag_start: usize,
    opening_tag_end: Option<usize>,
    text_start: Option<usize>,
    closing_tag_start: Option<usize>,
    line_number: usize,
    children: Vec<usize>,
    parent: Option<usize>,
}

/// Builds an element tree from start/data/end callbacks, each given the
/// byte cursor at which the event begins.
///
/// Text is buffered until the next structural event and then attached to
/// the most recent element: as its `text` if that element's start was the
/// last structural event, otherwise as its `tail`.
#[derive(Debug, Default)]
pub struct OffsetTreeBuilder {
    nodes: Vec<PendingNode>,
    stack: Vec<usize>,
    last: Option<usize>,
    last_was_end: bool,
    data: Vec<String>,
    data_start: Option<usize>,
    root: Option<usize>,
}

impl OffsetTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush(&mut self) {
        if self.data.is_empty() {
            return;
        }
        let text = self.data.concat();
        self.data.clear();
        let data_start = self.data_start.take();
        let Some(last) = self.last else {
            return;
        };
        let node = &mut self.nodes[last];
        if self.last_was_end {
            node.tail = Some(text);
        } else {
            node.text = Some(text);
            node.text_start = data_start;
        }
    }

    /// An opening tag begins at `cursor`.
    pub fn start(
        &mut self,
        tag: String,
        local_name: String,
        attributes: Vec<(String, String)>,
        cursor: usize,
        line_number: usize,
    ) -> usize {
        self.close_open_tag(cursor);
        self.flush();
        let parent = self.stack.last().copied();
        let id = self.nodes.len();
        self.nodes.push(PendingNode {
            tag,
            local_name,
            attributes,
            text: None,
            tail: None,
            opening_tag_start: cursor,
            opening_tag_end: None,
            text_start: None,
            closing_tag_start: None,
            line_number,
            children: Vec::new(),
            parent,
        });
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
        self.stack.push(id);
        self.last = Some(id);
        self.last_was_end = false;
        id
    }

    /// The opening tag of the innermost open element ended just before
    /// `cursor`. Only the first report counts.
    pub fn close_open_tag(&mut self, cursor: usize) {
        if let Some(&open) = self.stack.last() {
            let node = &mut self.nodes[open];
            if node.opening_tag_end.is_none() {
                node.opening_tag_end = Some(cursor);
            }
        }
    }

    /// Character data beginning at `cursor`.
    pub fn data(&mut self, text: String, cursor: usize) {
        self.close_open_tag(cursor);
        if self.data_start.is_none() {
            self.data_start = Some(cursor);
        }
        self.data.push(text);
    }

    /// A closing tag for `tag` begins at `cursor`.
    pub fn end(&mut self, tag: &str, cursor: usize) -> Result<()> {
        self.close_open_tag(cursor);
        self.flush();
        let id = self.stack.pop().ok_or_else(|| HighlightError::MismatchedEndTag {
            expected: String::new(),
            found: tag.to_string(),
        })?;
        let node = &mut self.nodes[id];
        if node.tag != tag {
            return Err(HighlightError::MismatchedEndTag {
                expected: node.tag.clone(),
                found: tag.to_string(),
            });
        }
        node.closing_tag_start = Some(cursor);
        self.last = Some(id);
        self.last_was_end = true;
        Ok(())
    }

    /// Finish the tree. Unclosed elements or a missing root are errors.
    pub fn close(mut self) -> Result<(Vec<XmlNode>, usize)> {
        self.flush();
        if !self.stack.is_empty() {
            return Err(HighlightError::UnclosedElements(self.stack.len()));
        }
        let root = self.root.ok_or(HighlightError::NoRootElement)?;
        let nodes = self
            .nodes
            .into_iter()
            .map(|n| {
                let opening_tag_end = n.opening_tag_end.unwrap_or(n.opening_tag_start);
                XmlNode {
                    tag: n.tag,
                    local_name: n.local_name,
                    attributes: n.attributes,
                    text: n.text,
                    tail: n.tail,
                    opening_tag_start: n.opening_tag_start,
                    opening_tag_end,
                    text_start: n.text_start.unwrap_or(opening_tag_end),
                    closing_tag_start: n.closing_tag_start.unwrap_or(opening_tag_end),
                    line_number: n.line_number,
                    children: n.children,
                    parent: n.parent,
                }
            })
            .collect();
        Ok((nodes, root))
    }
}

/// Incremental 1-based line counter over a byte buffer.
struct LineCounter<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        let offset = offset.min(self.bytes.len());
        if offset > self.pos {
            self.line += self.bytes[self.pos..offset]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.pos = offset;
        }
        self.line
    }
}

fn element_parts(e: &BytesStart<'_>) -> Result<(String, String, Vec<(String, String)>)> {
    let tag = std::str::from_utf8(e.name().as_ref())?.to_string();
    let local_name = std::str::from_utf8(e.local_name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok((tag, local_name, attributes))
}

/// A parsed XML document, optionally bound to the file it was read from.
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    root: usize,
    file: Option<Rc<HighlightedFile>>,
}

/// Parse raw bytes. Elements of the result cannot record.
pub fn parse_bytes(bytes: &[u8]) -> Result<XmlDocument> {
    let (nodes, root) = build_tree(bytes)?;
    Ok(XmlDocument {
        nodes,
        root,
        file: None,
    })
}

/// Parse the contents of `file`; elements record into its character store.
pub fn parse(file: &Rc<HighlightedFile>) -> Result<XmlDocument> {
    let (nodes, root) = build_tree(file.bytes()?)?;
    tracing::debug!(elements = nodes.len(), "parsed xml document");
    Ok(XmlDocument {
        nodes,
        root,
        file: Some(Rc::clone(file)),
    })
}

/// Open `path` as a [`HighlightedFile`] and parse it.
pub fn parse_path(path: &Path) -> Result<XmlDocument> {
    parse(&HighlightedFile::open(path))
}

fn build_tree(bytes: &[u8]) -> Result<(Vec<XmlNode>, usize)> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);
    let mut builder = OffsetTreeBuilder::new();
    let mut lines = LineCounter::new(bytes);

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        let after = reader.buffer_position() as usize;
        match event {
            Event::Start(e) => {
                let (tag, local, attrs) = element_parts(&e)?;
                builder.start(tag, local, attrs, before, lines.line_at(before));
                builder.close_open_tag(after);
            }
            Event::Empty(e) => {
                let (tag, local, attrs) = element_parts(&e)?;
                builder.start(tag.clone(), local, attrs, before, lines.line_at(before));
                builder.close_open_tag(after);
                builder.end(&tag, after)?;
            }
            Event::End(e) => {
                let tag = std::str::from_utf8(e.name().as_ref())?.to_string();
                builder.end(&tag, before)?;
            }
            Event::Text(t) => builder.data(t.unescape()?.into_owned(), before),
            Event::CData(c) => builder.data(String::from_utf8(c.into_inner().into_owned())?, before),
            Event::Eof => break,
            _ => {}
        }
    }
    builder.close()
}

impl XmlDocument {
    pub fn root(&self) -> Element<'_> {
        Element {
            doc: self,
            id: self.root,
        }
    }

    pub fn highlighted_file(&self) -> Option<&Rc<HighlightedFile>> {
        self.file.as_ref()
    }

    /// Every element in document order.
    pub fn elements(&self) -> impl Iterator<Item = Element<'_>> {
        (0..self.nodes.len()).map(move |id| Element { doc: self, id })
    }
}

/// Handle to one element of an [`XmlDocument`].
#[derive(Debug, Clone, Copy)]
pub struct Element<'d> {
    doc: &'d XmlDocument,
    id: usize,
}

impl<'d> Element<'d> {
    pub fn node(&self) -> &'d XmlNode {
        &self.doc.nodes[self.id]
    }

    pub fn tag(&self) -> &'d str {
        &self.node().tag
    }

    pub fn local_name(&self) -> &'d str {
        &self.node().local_name
    }

    pub fn text(&self) -> Option<&'d str> {
        self.node().text.as_deref()
    }

    pub fn tail(&self) -> Option<&'d str> {
        self.node().tail.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&'d str> {
        self.node()
            .attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn line_number(&self) -> usize {
        self.node().line_number
    }

    pub fn parent(&self) -> Option<Element<'d>> {
        self.node().parent.map(|id| Element { doc: self.doc, id })
    }

    pub fn children(&self) -> impl Iterator<Item = Element<'d>> + 'd {
        let doc = self.doc;
        self.node()
            .children
            .iter()
            .map(move |&id| Element { doc, id })
    }

    /// First direct child with the given local name.
    pub fn child(&self, local_name: &str) -> Option<Element<'d>> {
        self.children().find(|c| c.local_name() == local_name)
    }

    /// All descendants with the given local name, in document order.
    pub fn find_all(&self, local_name: &str) -> Vec<Element<'d>> {
        let mut found = Vec::new();
        let mut stack: Vec<usize> = self.node().children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.doc.nodes[id];
            if node.local_name == local_name {
                found.push(Element { doc: self.doc, id });
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /// Byte range covered by `part`.
    pub fn byte_range(&self, part: XmlPart) -> (usize, usize) {
        let node = self.node();
        match part {
            XmlPart::Text => (node.text_start, node.closing_tag_start),
            XmlPart::Opening => (node.opening_tag_start, node.opening_tag_end),
            XmlPart::All => (node.opening_tag_start, node.closing_tag_start),
        }
    }

    /// Record that `tool` read `value` for `field` from this element.
    ///
    /// Always stamps the characters and appends an extraction record; the
    /// tool's level is not consulted, so a datafile must be attached
    /// ([`HighlightError::NoDatafile`] otherwise). A range reaching past a
    /// line-limited store is [`HighlightError::OutsideStore`] and records
    /// nothing. Returns the character range stamped.
    pub fn record(
        &self,
        tool: &str,
        field: &str,
        value: impl Display,
        units: Option<&str>,
        part: XmlPart,
    ) -> Result<(usize, usize)> {
        let file = self.doc.file.as_ref().ok_or(HighlightError::NoHighlightedFile)?;
        file.require_datafile(tool)?;
        file.materialize()?;

        let (byte_start, byte_end) = self.byte_range(part);
        let (start, end) = file.byte_range_to_chars(byte_start, byte_end)?;
        let len = file.char_count();
        if end > len {
            return Err(HighlightError::OutsideStore { start, end, len });
        }
        let text = std::str::from_utf8(&file.bytes()?[byte_start..byte_end])?.to_string();
        let value = value.to_string();

        file.push_extracted_token(ExtractedToken {
            text,
            interpreted_value: value.clone(),
            text_location: format!("{}-{}", start, end),
            importer: tool.to_string(),
            field: field.to_string(),
        })?;

        let usage = Usage::new(format!("{}/{}", tool, field), usage_message(&value, units));
        Ok(file.set_usages_for_slice(start, end, &usage))
    }
}
