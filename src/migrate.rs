use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // One row per imported source file
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datafiles (
            id TEXT PRIMARY KEY,
            reference TEXT NOT NULL,
            hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // One row per recorded value, keyed to the row it produced
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS extractions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            datafile_id TEXT NOT NULL,
            destination_table TEXT NOT NULL,
            entry_id TEXT NOT NULL,
            field TEXT NOT NULL,
            importer TEXT NOT NULL,
            interpreted_value TEXT NOT NULL,
            text TEXT NOT NULL,
            text_location TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (datafile_id) REFERENCES datafiles(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_extractions_datafile_id ON extractions(datafile_id)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_extractions_entry ON extractions(destination_table, entry_id)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
