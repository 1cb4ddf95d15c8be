//! SQLite-backed [`ExtractionStore`] implementation.
//!
//! Writes to the `datafiles` and `extractions` tables created by
//! [`crate::migrate`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use tracklight_core::store::{DatafileRecord, ExtractionRow, ExtractionStore};

/// SQLite implementation of the [`ExtractionStore`] trait.
pub struct SqliteExtractionStore {
    pool: SqlitePool,
}

impl SqliteExtractionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn datafile(&self, id: &str) -> Result<Option<DatafileRecord>> {
        let row = sqlx::query("SELECT id, reference, hash, created_at FROM datafiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| DatafileRecord {
            id: r.get("id"),
            reference: r.get("reference"),
            hash: r.get("hash"),
            created_at: r.get("created_at"),
        }))
    }
}

fn row_to_extraction(row: &SqliteRow) -> ExtractionRow {
    ExtractionRow {
        datafile_id: row.get("datafile_id"),
        destination_table: row.get("destination_table"),
        entry_id: row.get("entry_id"),
        field: row.get("field"),
        importer: row.get("importer"),
        interpreted_value: row.get("interpreted_value"),
        text: row.get("text"),
        text_location: row.get("text_location"),
    }
}

const SELECT_EXTRACTIONS: &str = "SELECT datafile_id, destination_table, entry_id, field, importer, \
     interpreted_value, text, text_location FROM extractions";

#[async_trait]
impl ExtractionStore for SqliteExtractionStore {
    async fn save_datafile(&self, datafile: &DatafileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO datafiles (id, reference, hash, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                reference = excluded.reference,
                hash = excluded.hash
            "#,
        )
        .bind(&datafile.id)
        .bind(&datafile.reference)
        .bind(&datafile.hash)
        .bind(datafile.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_extractions(&self, rows: &[ExtractionRow]) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for row in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO extractions (datafile_id, destination_table, entry_id, field,
                                         importer, interpreted_value, text, text_location,
                                         created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.datafile_id)
            .bind(&row.destination_table)
            .bind(&row.entry_id)
            .bind(&row.field)
            .bind(&row.importer)
            .bind(&row.interpreted_value)
            .bind(&row.text)
            .bind(&row.text_location)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!("failed to insert extraction for {}: {}", row.datafile_id, e))?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn extractions_for_datafile(&self, datafile_id: &str) -> Result<Vec<ExtractionRow>> {
        let rows = sqlx::query(&format!("{} WHERE datafile_id = ? ORDER BY id", SELECT_EXTRACTIONS))
            .bind(datafile_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_extraction).collect())
    }

    async fn extractions_for_entry(
        &self,
        destination_table: &str,
        entry_id: &str,
    ) -> Result<Vec<ExtractionRow>> {
        let rows = sqlx::query(&format!(
            "{} WHERE destination_table = ? AND entry_id = ? ORDER BY id",
            SELECT_EXTRACTIONS
        ))
        .bind(destination_table)
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_extraction).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::migrate;
    use tracklight_core::models::{ExtractedToken, MeasurementRef};

    async fn store_in(dir: &tempfile::TempDir) -> SqliteExtractionStore {
        let mut config = Config::minimal();
        config.db.path = dir.path().join("data").join("t.sqlite");
        migrate::run_migrations(&config).await.unwrap();
        SqliteExtractionStore::new(db::connect(&config).await.unwrap())
    }

    #[tokio::test]
    async fn test_round_trip_through_sqlite() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir).await;

        let datafile = DatafileRecord {
            id: "df-1".into(),
            reference: "track.gpx".into(),
            hash: "00".into(),
            created_at: 1,
        };
        store.save_datafile(&datafile).await.unwrap();
        assert_eq!(store.datafile("df-1").await.unwrap(), Some(datafile));

        let token = ExtractedToken {
            text: "268.7".into(),
            interpreted_value: "268.7".into(),
            text_location: "310-315".into(),
            importer: "GPX".into(),
            field: "course".into(),
        };
        let rows = vec![
            ExtractionRow::from_token("df-1", &MeasurementRef::new("elements", "3"), &token),
            ExtractionRow::from_token("df-1", &MeasurementRef::new("elements", "4"), &token),
        ];
        assert_eq!(store.insert_extractions(&rows).await.unwrap(), 2);

        let all = store.extractions_for_datafile("df-1").await.unwrap();
        assert_eq!(all, rows);
        let one = store.extractions_for_entry("elements", "4").await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].entry_id, "4");
    }

    #[tokio::test]
    async fn test_unknown_datafile_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir).await;
        let token = ExtractedToken {
            text: "x".into(),
            interpreted_value: "x".into(),
            text_location: "0-1".into(),
            importer: "T".into(),
            field: "f".into(),
        };
        let rows = vec![ExtractionRow::from_token(
            "missing",
            &MeasurementRef::new("lines", "1"),
            &token,
        )];
        assert!(store.insert_extractions(&rows).await.is_err());
    }
}
