//! The datafile being imported and the extractions recorded against it.
//!
//! Recording at the `database` level appends [`ExtractedToken`]s to the
//! datafile's pending list. Importers group them per output row by setting
//! the current measurement object and flushing once the row is complete.
//! [`Datafile::commit_batch`] then snapshots everything for persistence.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracklight_core::models::{ExtractedToken, MeasurementRef};
use tracklight_core::store::{DatafileRecord, ExtractionRow, ExtractionStore};
use uuid::Uuid;

/// One source file registered for import.
#[derive(Debug, Clone)]
pub struct Datafile {
    id: String,
    reference: String,
    hash: String,
    /// Tokens recorded since the last flush.
    pub pending_extracted_tokens: Vec<ExtractedToken>,
    current_measurement_object: Option<MeasurementRef>,
    measurement_object_to_tokens: Vec<(MeasurementRef, Vec<ExtractedToken>)>,
}

impl Datafile {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reference: reference.into(),
            hash: String::new(),
            pending_extracted_tokens: Vec::new(),
            current_measurement_object: None,
            measurement_object_to_tokens: Vec::new(),
        }
    }

    /// Register a file on disk, hashing its contents.
    pub fn for_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read datafile: {}", path.display()))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let mut datafile = Self::new(path.display().to_string());
        datafile.hash = format!("{:x}", hasher.finalize());
        Ok(datafile)
    }

    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn set_current_measurement_object(&mut self, measurement: MeasurementRef) {
        self.current_measurement_object = Some(measurement);
    }

    pub fn current_measurement_object(&self) -> Option<&MeasurementRef> {
        self.current_measurement_object.as_ref()
    }

    /// Move pending tokens under the current measurement object.
    ///
    /// Without a current object the pending tokens are discarded, since
    /// they did not produce a row.
    pub fn flush_extracted_tokens(&mut self) {
        let tokens = std::mem::take(&mut self.pending_extracted_tokens);
        if tokens.is_empty() {
            return;
        }
        let Some(current) = self.current_measurement_object.clone() else {
            tracing::debug!(dropped = tokens.len(), "no measurement object, dropping tokens");
            return;
        };
        match self
            .measurement_object_to_tokens
            .iter_mut()
            .find(|(m, _)| *m == current)
        {
            Some((_, existing)) => existing.extend(tokens),
            None => self.measurement_object_to_tokens.push((current, tokens)),
        }
    }

    /// Flushed tokens per measurement object, in first-flush order.
    pub fn measurement_object_to_tokens(&self) -> &[(MeasurementRef, Vec<ExtractedToken>)] {
        &self.measurement_object_to_tokens
    }

    pub fn tokens_for(&self, measurement: &MeasurementRef) -> Option<&[ExtractedToken]> {
        self.measurement_object_to_tokens
            .iter()
            .find(|(m, _)| m == measurement)
            .map(|(_, tokens)| tokens.as_slice())
    }

    pub fn record(&self) -> DatafileRecord {
        DatafileRecord {
            id: self.id.clone(),
            reference: self.reference.clone(),
            hash: self.hash.clone(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn extraction_rows(&self) -> Vec<ExtractionRow> {
        self.measurement_object_to_tokens
            .iter()
            .flat_map(|(measurement, tokens)| {
                tokens
                    .iter()
                    .map(move |t| ExtractionRow::from_token(&self.id, measurement, t))
            })
            .collect()
    }

    /// Persist the datafile and every flushed extraction.
    pub async fn commit(&self, store: &dyn ExtractionStore) -> Result<u64> {
        self.commit_batch().commit(store).await
    }

    /// Snapshot the datafile and its flushed extractions.
    pub fn commit_batch(&self) -> CommitBatch {
        CommitBatch {
            datafile: self.record(),
            rows: self.extraction_rows(),
        }
    }
}

/// Owned snapshot of a datafile ready to be written to a store.
#[derive(Debug, Clone)]
pub struct CommitBatch {
    pub datafile: DatafileRecord,
    pub rows: Vec<ExtractionRow>,
}

impl CommitBatch {
    /// Write the datafile row, then its extraction rows. Returns rows written.
    pub async fn commit(&self, store: &dyn ExtractionStore) -> Result<u64> {
        store.save_datafile(&self.datafile).await?;
        let written = store.insert_extractions(&self.rows).await?;
        tracing::info!(
            datafile = %self.datafile.id,
            rows = written,
            "committed extractions"
        );
        Ok(written)
    }
}
