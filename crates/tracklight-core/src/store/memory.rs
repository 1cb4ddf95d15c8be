//! In-memory [`ExtractionStore`] implementation for testing.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{DatafileRecord, ExtractionRow, ExtractionStore};

/// In-memory store for tests and dry runs.
pub struct InMemoryExtractionStore {
    datafiles: RwLock<HashMap<String, DatafileRecord>>,
    extractions: RwLock<Vec<ExtractionRow>>,
}

impl InMemoryExtractionStore {
    pub fn new() -> Self {
        Self {
            datafiles: RwLock::new(HashMap::new()),
            extractions: RwLock::new(Vec::new()),
        }
    }

    pub fn datafile(&self, id: &str) -> Option<DatafileRecord> {
        self.datafiles.read().ok()?.get(id).cloned()
    }
}

impl Default for InMemoryExtractionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory extraction store lock poisoned")
}

#[async_trait]
impl ExtractionStore for InMemoryExtractionStore {
    async fn save_datafile(&self, datafile: &DatafileRecord) -> Result<()> {
        let mut datafiles = self.datafiles.write().map_err(poisoned)?;
        datafiles.insert(datafile.id.clone(), datafile.clone());
        Ok(())
    }

    async fn insert_extractions(&self, rows: &[ExtractionRow]) -> Result<u64> {
        {
            let datafiles = self.datafiles.read().map_err(poisoned)?;
            if let Some(missing) = rows.iter().find(|r| !datafiles.contains_key(&r.datafile_id)) {
                return Err(anyhow!("unknown datafile: {}", missing.datafile_id));
            }
        }
        let mut stored = self.extractions.write().map_err(poisoned)?;
        stored.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn extractions_for_datafile(&self, datafile_id: &str) -> Result<Vec<ExtractionRow>> {
        let stored = self.extractions.read().map_err(poisoned)?;
        Ok(stored
            .iter()
            .filter(|r| r.datafile_id == datafile_id)
            .cloned()
            .collect())
    }

    async fn extractions_for_entry(
        &self,
        destination_table: &str,
        entry_id: &str,
    ) -> Result<Vec<ExtractionRow>> {
        let stored = self.extractions.read().map_err(poisoned)?;
        Ok(stored
            .iter()
            .filter(|r| r.destination_table == destination_table && r.entry_id == entry_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedToken, MeasurementRef};

    fn datafile(id: &str) -> DatafileRecord {
        DatafileRecord {
            id: id.to_string(),
            reference: "rep_test1.rep".to_string(),
            hash: "abc".to_string(),
            created_at: 0,
        }
    }

    fn token(field: &str, location: &str) -> ExtractedToken {
        ExtractedToken {
            text: "6.00".to_string(),
            interpreted_value: "6.0 knot".to_string(),
            text_location: location.to_string(),
            importer: "Replay Importer".to_string(),
            field: field.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_query_by_datafile_and_entry() {
        let store = InMemoryExtractionStore::new();
        store.save_datafile(&datafile("df1")).await.unwrap();

        let state = MeasurementRef::new("States", "1");
        let other = MeasurementRef::new("States", "2");
        let rows = vec![
            ExtractionRow::from_token("df1", &state, &token("speed", "302-306")),
            ExtractionRow::from_token("df1", &state, &token("heading", "294-300")),
            ExtractionRow::from_token("df1", &other, &token("speed", "400-404")),
        ];
        assert_eq!(store.insert_extractions(&rows).await.unwrap(), 3);

        let all = store.extractions_for_datafile("df1").await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].field, "speed");

        let for_state = store.extractions_for_entry("States", "1").await.unwrap();
        assert_eq!(for_state.len(), 2);
        assert!(for_state.iter().all(|r| r.entry_id == "1"));
    }

    #[tokio::test]
    async fn test_insert_for_unknown_datafile_fails() {
        let store = InMemoryExtractionStore::new();
        let rows = vec![ExtractionRow::from_token(
            "missing",
            &MeasurementRef::new("States", "1"),
            &token("speed", "0-4"),
        )];
        assert!(store.insert_extractions(&rows).await.is_err());
    }
}
