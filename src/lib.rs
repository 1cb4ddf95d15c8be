//! # Tracklight
//!
//! Provenance highlighting for maritime track files.
//!
//! Importers read positions, courses and speeds out of text and XML track
//! formats. Tracklight records, per character of the source file, which
//! tool interpreted it, for which field, and as what value. The result is
//! an HTML rendering with every interpreted span shaded and annotated, plus
//! optional extraction rows tying each stored value back to its source
//! text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ Track file  │──▶│ Lines / Tokens │──▶│ Char usages  │──▶ HTML report
//! │ .rep .gpx … │   │  XML elements  │   │ (per char)   │
//! └─────────────┘   └────────────────┘   └──────┬───────┘
//!                                               ▼
//!                                        ┌──────────────┐
//!                                        │ extractions  │ SQLite
//!                                        └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tracklight init                          # create database
//! tracklight highlight tracks/rep_test1.rep --key
//! tracklight highlight tracks/track.gpx --json
//! tracklight scan                          # every file under [sources.filesystem]
//! tracklight extractions <datafile-id>
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`highlighter`] | Character store for one file |
//! | [`token`] | Lines, tokens and recording |
//! | [`tokenize`] | Token grammars and quoting |
//! | [`combine`] | Merge several tokens into one |
//! | [`xml_parser`] | XML parsing with byte offsets |
//! | [`export`] | HTML report output |
//! | [`datafile`] | Pending extractions per source file |
//! | [`config`] | TOML configuration parsing |
//! | [`pipeline`] | The generic highlight run |
//! | [`scan`] | Filesystem source discovery |
//! | [`sqlite_store`] | SQLite extraction store |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod combine;
pub mod config;
pub mod datafile;
pub mod db;
pub mod error;
pub mod export;
pub mod extractions;
pub mod highlighter;
pub mod migrate;
pub mod pipeline;
pub mod scan;
pub mod sqlite_store;
pub mod token;
pub mod tokenize;
pub mod xml_parser;

pub use combine::combine_tokens;
pub use error::{HighlightError, Result};
pub use highlighter::HighlightedFile;
pub use token::{create_test_line, Line, SpanGroup, SubToken, Token};
pub use xml_parser::XmlPart;
