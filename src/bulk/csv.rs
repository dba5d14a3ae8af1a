//! CSV import and export.
//!
//! One file per table, named `<table>.csv`, first line = column headers.
//! Import is a single transaction per table-file, committed at end of
//! file; a bad row is logged and skipped without aborting its siblings.
//! Export renders NULL as the empty field and leaves quoting to the
//! writer.

use std::path::Path;

use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::query::{self, value_to_field};
use crate::engine::schema::{quote_ident, REQUIRED_TABLES};

/// Export target directory for the batch form.
pub const EXPORT_DIR: &str = "exported_csv";

/// Row-count granularity for progress reporting inside a running import.
const BATCH_ROWS: u64 = 500;

fn build_insert(table: &str, headers: &[String]) -> String {
    let cols = headers
        .iter()
        .map(|h| quote_ident(h))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; headers.len()].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        cols,
        placeholders
    )
}

/// Positional bind parameters for one record, padded to the header width.
///
/// A record with fewer fields than headers gets NULL for the missing
/// trailing fields. A record with more fields than headers is rejected
/// (`None`): extra data silently vanishing is worse than a skipped row.
fn row_params(record: &csv::StringRecord, width: usize) -> Option<Vec<Option<String>>> {
    if record.len() > width {
        return None;
    }
    Some((0..width).map(|i| record.get(i).map(str::to_string)).collect())
}

/// Imports a CSV file into a table. Returns the number of rows actually
/// applied; skipped rows are logged, not counted.
#[instrument(skip(pool, path), fields(path = %path.display()))]
pub async fn import_csv(pool: &MySqlPool, table: &str, path: &Path) -> EngineResult<u64> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Ok(0);
    }

    let insert_sql = build_insert(table, &headers);

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| EngineError::import(e.to_string()))?;

    let mut applied: u64 = 0;
    let mut skipped: u64 = 0;

    for (index, record) in reader.records().enumerate() {
        // 1-based file line, accounting for the header row.
        let line = index + 2;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "unreadable CSV record; skipped");
                skipped += 1;
                continue;
            }
        };

        let Some(params) = row_params(&record, headers.len()) else {
            warn!(
                line,
                fields = record.len(),
                expected = headers.len(),
                "row has more fields than headers; skipped"
            );
            skipped += 1;
            continue;
        };

        let mut insert = sqlx::query(&insert_sql);
        for param in params {
            insert = insert.bind(param);
        }

        match insert.execute(&mut *tx).await {
            Ok(_) => {
                applied += 1;
                if applied % BATCH_ROWS == 0 {
                    debug!(table, rows = applied, "import batch flushed");
                }
            }
            Err(e) => {
                warn!(line, error = %e, "row insert failed; skipped");
                skipped += 1;
            }
        }
    }

    tx.commit()
        .await
        .map_err(|e| EngineError::import(e.to_string()))?;

    info!(table, applied, skipped, "CSV import complete");
    Ok(applied)
}

async fn column_names(pool: &MySqlPool, table: &str) -> EngineResult<Vec<String>> {
    // Cast to CHAR to avoid BINARY type mismatch with Rust String
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT CAST(COLUMN_NAME AS CHAR) AS column_name
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| EngineError::execution_error(e.to_string()))?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Exports a full table to a CSV file. Returns the number of rows written.
#[instrument(skip(pool, path), fields(path = %path.display()))]
pub async fn export_csv(pool: &MySqlPool, table: &str, path: &Path) -> EngineResult<u64> {
    let result = query::fetch_table(pool, table).await?;

    // An empty table yields no result metadata; the header still has to
    // name every column.
    let header: Vec<String> = if result.columns.is_empty() {
        column_names(pool, table).await?
    } else {
        result.columns.iter().map(|c| c.name.clone()).collect()
    };

    if header.is_empty() {
        return Err(EngineError::export(format!(
            "table '{table}' has no columns"
        )));
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&header)?;

    for row in &result.rows {
        let fields: Vec<String> = row.values.iter().map(value_to_field).collect();
        writer.write_record(&fields)?;
    }
    writer.flush()?;

    info!(table, rows = result.rows.len(), "exported table to CSV");
    Ok(result.rows.len() as u64)
}

/// Imports every `<table>.csv` present in `dir`, one table at a time.
/// Per-table failures are logged and do not abort sibling imports.
/// Returns the number of files imported.
#[instrument(skip(pool, dir), fields(dir = %dir.display()))]
pub async fn import_present_csvs(pool: &MySqlPool, dir: &Path) -> u64 {
    let mut imported = 0;

    for spec in REQUIRED_TABLES {
        let path = dir.join(format!("{}.csv", spec.name));
        if !path.exists() {
            continue;
        }
        info!(table = spec.name, path = %path.display(), "found CSV; importing");
        match import_csv(pool, spec.name, &path).await {
            Ok(_) => imported += 1,
            Err(e) => warn!(table = spec.name, error = %e, "CSV import failed; continuing"),
        }
    }

    imported
}

/// Exports every required table into `out_dir`, one file per table.
/// Per-table failures are logged and do not abort sibling exports.
/// Returns the number of tables exported.
#[instrument(skip(pool, out_dir), fields(dir = %out_dir.display()))]
pub async fn export_all_tables(pool: &MySqlPool, out_dir: &Path) -> u64 {
    if let Err(e) = std::fs::create_dir_all(out_dir) {
        warn!(dir = %out_dir.display(), error = %e, "cannot create export directory");
        return 0;
    }

    let mut exported = 0;
    for spec in REQUIRED_TABLES {
        let path = out_dir.join(format!("{}.csv", spec.name));
        match export_csv(pool, spec.name, &path).await {
            Ok(_) => exported += 1,
            Err(e) => warn!(table = spec.name, error = %e, "export failed; continuing"),
        }
    }

    exported
}
