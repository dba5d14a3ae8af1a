//! Row and value plumbing for table reads.
//!
//! CSV export and table preview both need to read arbitrary rows without
//! knowing the column types up front, so decoding walks an ordered
//! `try_get` cascade into the universal [`Value`] type.

use std::time::Instant;

use rust_decimal::Decimal;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{Column, Row as SqlxRow, TypeInfo};
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::schema::quote_ident;
use crate::engine::types::{ColumnInfo, QueryResult, Row, Value};

/// Extracts a value from a row at the given index.
///
/// Unsigned integers are tried first for BIGINT UNSIGNED key columns.
fn extract_value(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(|u| Value::Int(u as i64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::Int).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u32>, _>(idx) {
        return v.map(|u| Value::Int(u as i64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
        return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::Float).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|f| Value::Float(f as f64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Decimal>, _>(idx) {
        return v
            .map(|d| Value::Text(d.to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::Text).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v
            .map(|dt| Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v
            .map(|dt| Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v
            .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return v
            .map(|t| Value::Text(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v.map(Value::Bytes).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(idx) {
        return v.map(Value::Json).unwrap_or(Value::Null);
    }

    Value::Null
}

fn convert_row(mysql_row: &MySqlRow) -> Row {
    let values = mysql_row
        .columns()
        .iter()
        .map(|col| extract_value(mysql_row, col.ordinal()))
        .collect();

    Row { values }
}

fn column_info(row: &MySqlRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo {
            name: col.name().to_string(),
            data_type: col.type_info().name().to_string(),
        })
        .collect()
}

async fn fetch(pool: &MySqlPool, sql: &str) -> EngineResult<QueryResult> {
    let start = Instant::now();
    let mysql_rows: Vec<MySqlRow> = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|e| EngineError::execution_error(e.to_string()))?;

    let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;

    if mysql_rows.is_empty() {
        return Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms,
        });
    }

    Ok(QueryResult {
        columns: column_info(&mysql_rows[0]),
        rows: mysql_rows.iter().map(convert_row).collect(),
        execution_time_ms,
    })
}

/// Reads an entire table, in storage order.
#[instrument(skip(pool))]
pub async fn fetch_table(pool: &MySqlPool, table: &str) -> EngineResult<QueryResult> {
    let sql = format!("SELECT * FROM {}", quote_ident(table));
    fetch(pool, &sql).await
}

/// Reads the first `limit` rows of a table.
#[instrument(skip(pool))]
pub async fn preview_table(pool: &MySqlPool, table: &str, limit: u32) -> EngineResult<QueryResult> {
    let sql = format!("SELECT * FROM {} LIMIT {}", quote_ident(table), limit);
    fetch(pool, &sql).await
}

/// Renders a value as a CSV field. NULL becomes the empty field; binary
/// data crosses the text boundary as base64.
pub fn value_to_field(value: &Value) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};

    match value {
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => STANDARD.encode(b),
        Value::Json(j) => j.to_string(),
    }
}
