//! Extraction retrieval by datafile ID.
//!
//! Lists every stored extraction of one datafile: which importer read
//! which text, at which character location, and which row it produced.

use anyhow::{bail, Result};
use serde::Serialize;
use tracklight_core::store::{DatafileRecord, ExtractionRow, ExtractionStore};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteExtractionStore;

/// A datafile and its extraction rows.
#[derive(Debug, Clone, Serialize)]
pub struct DatafileExtractions {
    pub id: String,
    pub reference: String,
    pub hash: String,
    pub created_at: String, // ISO8601
    pub extractions: Vec<ExtractionRow>,
}

/// Core lookup returning structured data.
pub async fn get_extractions(config: &Config, datafile_id: &str) -> Result<DatafileExtractions> {
    let pool = db::connect(config).await?;
    let store = SqliteExtractionStore::new(pool);

    let Some(DatafileRecord {
        id,
        reference,
        hash,
        created_at,
    }) = store.datafile(datafile_id).await?
    else {
        store.pool().close().await;
        bail!("datafile not found: {}", datafile_id);
    };

    let extractions = store.extractions_for_datafile(datafile_id).await?;
    store.pool().close().await;

    Ok(DatafileExtractions {
        id,
        reference,
        hash,
        created_at: format_ts_iso(created_at),
        extractions,
    })
}

/// CLI entry point for `extractions`.
pub async fn run_extractions(config: &Config, datafile_id: &str, json: bool) -> Result<()> {
    let found = get_extractions(config, datafile_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    println!("--- Datafile ---");
    println!("id:         {}", found.id);
    println!("reference:  {}", found.reference);
    println!("hash:       {}", found.hash);
    println!("created_at: {}", found.created_at);
    println!();

    println!("--- Extractions ({}) ---", found.extractions.len());
    for row in &found.extractions {
        println!(
            "[{} {}] {}/{} @ {}",
            row.destination_table, row.entry_id, row.importer, row.field, row.text_location
        );
        println!("  text:  {}", row.text);
        println!("  value: {}", row.interpreted_value);
    }

    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
