//! Dataset export: flat CSV, district-grouped JSON, and the on-disk
//! snapshot artifacts.

use crate::catalog::{CSV_COLUMNS, JSON_EXPORT_KEYS};
use crate::error::{Result, ServiceError};
use crate::response;
use anyhow::Context;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Group label for records without a district name.
pub const UNKNOWN_DISTRICT: &str = "Nepoznato";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Unknown or missing formats fall back to CSV; the export endpoint is
    /// a download link and must not fail on a stale query string.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Csv
        }
    }
}

/// Flat CSV with the fixed header row; null cells are empty.
pub fn build_csv(rows: &[Value]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(CSV_COLUMNS)
        .context("failed to write CSV header")?;

    for row in rows {
        let record: Vec<String> = CSV_COLUMNS
            .iter()
            .map(|key| cell_text(row.get(*key)))
            .collect();
        writer
            .write_record(&record)
            .context("failed to write CSV row")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ServiceError::Internal(anyhow::anyhow!(err)))?;
    String::from_utf8(bytes)
        .context("CSV payload was not valid UTF-8")
        .map_err(ServiceError::Internal)
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// District-grouped JSON document for the download endpoint. Groups keep
/// first-seen order; records with a blank or missing district land under
/// the fixed fallback label, never a separate empty-key group. lon/lat are
/// coerced to plain numbers or null.
pub fn build_grouped_json(rows: &[Value]) -> Value {
    grouped(rows, export_entry)
}

/// Snapshot flavor of the grouped document: every entry also carries the
/// JSON-LD context and type. The download endpoint stays unannotated; only
/// the on-disk artifact promises the annotations.
pub fn build_snapshot_json(rows: &[Value]) -> Value {
    grouped(rows, |row| response::with_semantics(&export_entry(row)))
}

fn grouped(rows: &[Value], entry: impl Fn(&Value) -> Value) -> Value {
    let mut order: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<Value>> = Vec::new();

    for row in rows {
        let district = match row.get("naziv_gc") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => UNKNOWN_DISTRICT.to_string(),
        };

        let index = match order.iter().position(|name| *name == district) {
            Some(index) => index,
            None => {
                order.push(district);
                groups.push(Vec::new());
                order.len() - 1
            }
        };

        groups[index].push(entry(row));
    }

    Value::Array(
        order
            .into_iter()
            .zip(groups)
            .map(|(district, items)| json!({ "district": district, "items": items }))
            .collect(),
    )
}

fn export_entry(row: &Value) -> Value {
    let mut entry = Map::with_capacity(JSON_EXPORT_KEYS.len());
    for key in JSON_EXPORT_KEYS {
        let value = match row.get(*key) {
            None | Some(Value::Null) => Value::Null,
            Some(Value::String(text)) if text.is_empty() => Value::Null,
            Some(value) if *key == "lon" || *key == "lat" => coerce_coordinate(value),
            Some(value) => value.clone(),
        };
        entry.insert((*key).to_string(), value);
    }
    Value::Object(entry)
}

fn coerce_coordinate(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Snapshot artifact paths under the configured directory.
pub fn snapshot_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join("wells.csv"), dir.join("wells.json"))
}

/// Writes both snapshot artifacts. Each file is written to a temporary
/// sibling and persisted over the target, so a concurrent reader never
/// observes a partial file. Racing writers are last-writer-wins.
pub fn write_snapshots(dir: &Path, rows: &[Value]) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;

    let (csv_path, json_path) = snapshot_paths(dir);

    let csv_payload = build_csv(rows)?;
    write_atomic(&csv_path, csv_payload.as_bytes())?;

    let json_payload = serde_json::to_string_pretty(&build_snapshot_json(rows))
        .context("failed to serialize grouped JSON snapshot")?;
    write_atomic(&json_path, json_payload.as_bytes())?;

    info!(rows = rows.len(), dir = %dir.display(), "snapshots refreshed");
    Ok((csv_path, json_path))
}

fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    std::fs::write(temp.path(), payload)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    temp.persist(path)
        .map_err(|err| anyhow::anyhow!("failed to persist snapshot {}: {err}", path.display()))?;
    Ok(())
}
