//! Storage abstraction for extraction provenance.
//!
//! The [`ExtractionStore`] trait is the narrow contract between the
//! highlighter and whatever persists its output: register a datafile,
//! insert the extraction rows produced for it, and read them back.
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{ExtractedToken, MeasurementRef};

/// A source file whose extractions are being stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatafileRecord {
    /// Datafile UUID.
    pub id: String,
    /// File name or path the datafile was read from.
    pub reference: String,
    /// SHA-256 of the file contents.
    pub hash: String,
    /// Unix timestamp (seconds) of registration.
    pub created_at: i64,
}

/// One persisted extraction: an [`ExtractedToken`] tied to the row it
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionRow {
    pub datafile_id: String,
    pub destination_table: String,
    pub entry_id: String,
    pub field: String,
    pub importer: String,
    pub interpreted_value: String,
    pub text: String,
    pub text_location: String,
}

impl ExtractionRow {
    pub fn from_token(datafile_id: &str, measurement: &MeasurementRef, token: &ExtractedToken) -> Self {
        Self {
            datafile_id: datafile_id.to_string(),
            destination_table: measurement.table.clone(),
            entry_id: measurement.entry_id.clone(),
            field: token.field.clone(),
            importer: token.importer.clone(),
            interpreted_value: token.interpreted_value.clone(),
            text: token.text.clone(),
            text_location: token.text_location.clone(),
        }
    }
}

/// Abstract storage backend for extraction provenance.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`save_datafile`](ExtractionStore::save_datafile) | Insert or update a datafile |
/// | [`insert_extractions`](ExtractionStore::insert_extractions) | Append extraction rows |
/// | [`extractions_for_datafile`](ExtractionStore::extractions_for_datafile) | All rows of one datafile |
/// | [`extractions_for_entry`](ExtractionStore::extractions_for_entry) | Rows that produced one entry |
#[async_trait]
pub trait ExtractionStore: Send + Sync {
    /// Insert or update a datafile record.
    async fn save_datafile(&self, datafile: &DatafileRecord) -> Result<()>;

    /// Append extraction rows. Returns the number of rows written.
    async fn insert_extractions(&self, rows: &[ExtractionRow]) -> Result<u64>;

    /// All extraction rows recorded for a datafile, in insertion order.
    async fn extractions_for_datafile(&self, datafile_id: &str) -> Result<Vec<ExtractionRow>>;

    /// Extraction rows that produced one entry of one table.
    async fn extractions_for_entry(
        &self,
        destination_table: &str,
        entry_id: &str,
    ) -> Result<Vec<ExtractionRow>>;
}
