use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use super::record::{EntityRecord, MetricValue};
use crate::scoring::WeightConfig;

/// Identifier columns tried, in order, when none is configured.
const ID_CANDIDATES: [&str; 4] = ["Name", "name", "id", "ID"];

/// A loaded entity snapshot.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id_field: String,
    /// Column names in source order (empty headers dropped).
    pub columns: Vec<String>,
    pub records: Vec<EntityRecord>,
}

impl Dataset {
    /// Columns that look like numeric metrics: every present value is a
    /// number and at least one value is present. The identifier is excluded.
    pub fn metric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| **column != self.id_field)
            .filter(|column| {
                let mut seen = false;
                for record in &self.records {
                    match record.get(column) {
                        Some(MetricValue::Number { .. }) => seen = true,
                        Some(MetricValue::Text(_)) => return false,
                        Some(MetricValue::Missing) | None => {}
                    }
                }
                seen
            })
            .cloned()
            .collect()
    }
}

/// Seed weights for a first run: `weight` for every metric column.
pub fn default_weights(dataset: &Dataset, weight: f64) -> WeightConfig {
    dataset
        .metric_columns()
        .into_iter()
        .map(|metric| (metric, weight))
        .collect()
}

/// Load entity records from a CSV file, or a JSON array of objects when the
/// path ends in `.json`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, no identifier
/// column can be found, or a row has an empty identifier.
pub fn load_dataset(path: &Path, id_field: Option<&str>) -> Result<Dataset> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let (columns, rows) = if is_json {
        read_json_rows(path)?
    } else {
        read_csv_rows(path)?
    };

    let id_field = resolve_id_field(&columns, id_field)
        .with_context(|| format!("No identifier column in {}", path.display()))?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, fields) in rows.into_iter().enumerate() {
        let id = match fields.get(&id_field) {
            Some(MetricValue::Missing) | None => String::new(),
            Some(value) => value.to_string(),
        };
        // 1-based, header excluded
        let record = EntityRecord::new(id, fields)
            .with_context(|| format!("Row {} of {}", i + 1, path.display()))?;
        records.push(record);
    }

    tracing::debug!(
        path = %path.display(),
        records = records.len(),
        columns = columns.len(),
        id_field = %id_field,
        "loaded dataset"
    );

    Ok(Dataset {
        id_field,
        columns,
        records,
    })
}

type Rows = Vec<BTreeMap<String, MetricValue>>;

fn read_csv_rows(path: &Path) -> Result<(Vec<String>, Rows)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset at {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header in {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let columns: Vec<String> = headers.iter().filter(|h| !h.is_empty()).cloned().collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = result
            .with_context(|| format!("Failed to parse CSV row {} in {}", i + 1, path.display()))?;
        let fields = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), MetricValue::from_cell(cell)))
            .collect();
        rows.push(fields);
    }

    Ok((columns, rows))
}

fn read_json_rows(path: &Path) -> Result<(Vec<String>, Rows)> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset at {}", path.display()))?;
    let parsed: Rows = serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse JSON dataset in {}", path.display()))?;

    let rows: Rows = parsed
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| (key.trim().to_string(), value))
                .filter(|(key, _)| !key.is_empty())
                .collect()
        })
        .collect();

    // JSON objects carry no column order, so columns follow first appearance
    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    Ok((columns, rows))
}

fn resolve_id_field(columns: &[String], configured: Option<&str>) -> Result<String> {
    if let Some(field) = configured {
        if columns.iter().any(|c| c == field) {
            return Ok(field.to_string());
        }
        bail!("configured identifier column '{}' is not present", field);
    }

    ID_CANDIDATES
        .iter()
        .find(|candidate| columns.iter().any(|c| c == *candidate))
        .map(|candidate| candidate.to_string())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "expected one of {} (or set id_field in the config)",
                ID_CANDIDATES.join(", ")
            )
        })
}
