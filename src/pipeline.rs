//! Highlighting pipeline orchestration.
//!
//! Coordinates one run: load → tokenize or parse → record → export HTML →
//! optionally commit extractions. The generic importer records every token
//! of a text file, or every text-bearing element of an XML file, so any
//! track file can be inspected without a format-specific importer.
//!
//! The character store is single-threaded; all recording happens in
//! [`annotate`] before any `.await`, which only sees owned results.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracklight_core::level::LevelLookup;
use tracklight_core::models::{HighlightLevel, MeasurementRef};

use crate::config::Config;
use crate::datafile::{CommitBatch, Datafile};
use crate::db;
use crate::error::HighlightError;
use crate::highlighter::HighlightedFile;
use crate::migrate;
use crate::scan;
use crate::sqlite_store::SqliteExtractionStore;
use crate::token::SpanGroup;
use crate::tokenize::Grammar;
use crate::xml_parser::{self, XmlPart};

/// Tool name recorded by the generic importer unless overridden.
pub const DEFAULT_TOOL: &str = "Token Highlighter";

/// Options for one `highlight` run.
#[derive(Debug, Clone)]
pub struct HighlightOptions {
    pub grammar: Grammar,
    pub tool: String,
    /// Overrides `highlighting.line_limit`.
    pub lines: Option<i64>,
    /// Overrides `<output.dir>/<file name>.html`.
    pub output: Option<PathBuf>,
    /// Forces the colour key on; otherwise `output.include_key` applies.
    pub key: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            grammar: Grammar::Whitespace,
            tool: DEFAULT_TOOL.to_string(),
            lines: None,
            output: None,
            key: false,
        }
    }
}

/// Outcome of highlighting one file.
#[derive(Debug, Clone, Serialize)]
pub struct HighlightSummary {
    pub datafile_id: String,
    pub source: String,
    pub kind: &'static str,
    pub level: String,
    pub measurements: usize,
    pub records: usize,
    pub output: String,
    pub extractions_committed: u64,
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xml") || e.eq_ignore_ascii_case("gpx"))
        .unwrap_or(false)
}

fn output_path(config: &Config, path: &Path, opts: &HighlightOptions) -> PathBuf {
    if let Some(out) = &opts.output {
        return out.clone();
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    config.output.dir.join(format!("{}.html", name))
}

/// Record every token of every line. Returns (measurements, records).
fn annotate_text(
    file: &Rc<HighlightedFile>,
    datafile: &Rc<RefCell<Datafile>>,
    opts: &HighlightOptions,
) -> Result<(usize, usize)> {
    let strip = opts.grammar.default_strip_char();
    let lines = file.lines()?;
    let mut records = 0;
    for (i, line) in lines.iter().enumerate() {
        datafile
            .borrow_mut()
            .set_current_measurement_object(MeasurementRef::new("lines", (i + 1).to_string()));
        for (j, token) in line.tokens(&opts.grammar, strip).iter().enumerate() {
            token.record(&opts.tool, &format!("token {}", j + 1), token.text(), None)?;
            records += 1;
        }
        datafile.borrow_mut().flush_extracted_tokens();
    }
    Ok((lines.len(), records))
}

/// Record the text of every element that has any.
fn annotate_xml(
    file: &Rc<HighlightedFile>,
    datafile: &Rc<RefCell<Datafile>>,
    opts: &HighlightOptions,
) -> Result<(usize, usize)> {
    let doc = xml_parser::parse(file)?;
    let mut measurements = 0;
    for element in doc.elements() {
        let Some(text) = element.text().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        datafile.borrow_mut().set_current_measurement_object(MeasurementRef::new(
            "elements",
            (measurements + 1).to_string(),
        ));
        match element.record(&opts.tool, element.local_name(), text, None, XmlPart::Text) {
            Ok(_) => measurements += 1,
            // past the line limit
            Err(HighlightError::OutsideStore { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
        datafile.borrow_mut().flush_extracted_tokens();
    }
    Ok((measurements, measurements))
}

/// Load, record and export one file. Nothing here awaits.
pub fn annotate(
    config: &Config,
    path: &Path,
    opts: &HighlightOptions,
) -> Result<(HighlightSummary, CommitBatch)> {
    let levels = config.level_registry()?;
    let level = levels.level_for(&opts.tool);

    let datafile = Datafile::for_path(path)?.shared();
    let mut builder = HighlightedFile::builder(path)
        .levels(levels)
        .datafile(Rc::clone(&datafile));
    if let Some(limit) = opts.lines.or(config.highlighting.line_limit) {
        builder = builder.line_limit(limit);
    }
    let file = builder.build();

    let kind = if is_xml(path) { "xml" } else { "text" };
    let annotated = if level == HighlightLevel::Disabled {
        Ok((0, 0))
    } else if kind == "xml" {
        annotate_xml(&file, &datafile, opts)
    } else {
        annotate_text(&file, &datafile, opts)
    };
    let (measurements, records) =
        annotated.with_context(|| format!("Failed to highlight {}", path.display()))?;

    // Unrecorded files still export their plain text
    file.materialize()?;
    let output = output_path(config, path, opts);
    file.export(&output, opts.key || config.output.include_key)?;

    let df = datafile.borrow();
    let summary = HighlightSummary {
        datafile_id: df.id().to_string(),
        source: path.display().to_string(),
        kind,
        level: level.to_string(),
        measurements,
        records,
        output: output.display().to_string(),
        extractions_committed: 0,
    };
    let batch = df.commit_batch();
    Ok((summary, batch))
}

/// Highlight one file and persist its extractions when the tool's level
/// is `database`.
pub async fn highlight_file(
    config: &Config,
    path: &Path,
    opts: &HighlightOptions,
) -> Result<HighlightSummary> {
    let (mut summary, batch) = annotate(config, path, opts)?;

    if summary.level == HighlightLevel::PersistAndRender.as_str() {
        migrate::run_migrations(config).await?;
        let pool = db::connect(config).await?;
        let store = SqliteExtractionStore::new(pool);
        summary.extractions_committed = batch.commit(&store).await?;
        store.pool().close().await;
    }

    Ok(summary)
}

fn print_summary(summary: &HighlightSummary) {
    println!("highlight {}", summary.source);
    println!("  datafile: {}", summary.datafile_id);
    println!("  kind: {}", summary.kind);
    println!("  level: {}", summary.level);
    println!("  measurements: {}", summary.measurements);
    println!("  records: {}", summary.records);
    println!("  extractions committed: {}", summary.extractions_committed);
    println!("  output: {}", summary.output);
}

/// CLI entry point for `highlight`.
pub async fn run_highlight(
    config: &Config,
    path: &Path,
    opts: &HighlightOptions,
    json: bool,
) -> Result<()> {
    let summary = highlight_file(config, path, opts).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        println!("ok");
    }
    Ok(())
}

/// CLI entry point for `scan`: highlight every configured source file.
/// Failures are logged and skipped.
pub async fn run_scan(config: &Config, opts: &HighlightOptions) -> Result<()> {
    let files = scan::scan_filesystem(config)?;
    let mut highlighted = 0;
    let mut failed = 0;
    let mut committed = 0;

    for file in &files {
        match highlight_file(config, &file.path, opts).await {
            Ok(summary) => {
                highlighted += 1;
                committed += summary.extractions_committed;
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(file = %file.relative, error = %format!("{:#}", e), "skipping file");
            }
        }
    }

    println!("scan filesystem");
    println!("  found: {} files", files.len());
    println!("  highlighted: {}", highlighted);
    println!("  failed: {}", failed);
    println!("  extractions committed: {}", committed);
    println!("ok");
    Ok(())
}
