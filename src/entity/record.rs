use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::numeric::tolerant_number;

/// A single cell of an entity record.
///
/// Rows arrive loosely typed (CSV cells, JSON values), so a metric is either
/// a number, free text, or absent. Numbers keep the text they were read from:
/// display and CSV export write `raw`, so `007` stays `007`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number { value: f64, raw: String },
    Text(String),
    Missing,
}

impl MetricValue {
    /// A number whose source text is its canonical rendering.
    pub fn number(value: f64) -> Self {
        MetricValue::Number {
            value,
            raw: value.to_string(),
        }
    }

    /// Classify a raw cell.
    ///
    /// Only plain decimals (digits, one optional leading '-', '.') become
    /// numbers; anything else is text and scored through `tolerant_number`,
    /// so `1e5` counts as 15, not 100000.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return MetricValue::Missing;
        }
        match plain_number(trimmed) {
            Some(value) => MetricValue::Number {
                value,
                raw: trimmed.to_string(),
            },
            None => MetricValue::Text(trimmed.to_string()),
        }
    }

    /// Value used by the scoring engine. Missing and unparseable cells count as 0.
    pub fn score_input(&self) -> f64 {
        match self {
            MetricValue::Number { value, .. } if value.is_finite() => *value,
            MetricValue::Number { .. } => 0.0,
            MetricValue::Text(s) => tolerant_number(s).unwrap_or(0.0),
            MetricValue::Missing => 0.0,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MetricValue::Missing)
    }
}

fn plain_number(s: &str) -> Option<f64> {
    let body = s.strip_prefix('-').unwrap_or(s);
    if body.chars().all(|c| c.is_ascii_digit() || c == '.') {
        tolerant_number(s)
    } else {
        None
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number { raw, .. } => f.write_str(raw),
            MetricValue::Text(s) => f.write_str(s),
            MetricValue::Missing => Ok(()),
        }
    }
}

/// JSON number, string or `null`. A number whose source text is not its
/// canonical rendering (`007`, `1.50`) is written as that text instead.
impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number { value, raw } if *raw == value.to_string() => {
                serializer.serialize_f64(*value)
            }
            MetricValue::Number { raw, .. } => serializer.serialize_str(raw),
            MetricValue::Text(s) => serializer.serialize_str(s),
            MetricValue::Missing => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(MetricValue::Missing),
            Value::Number(n) => match n.as_f64() {
                Some(value) if value.is_finite() => Ok(MetricValue::Number {
                    value,
                    raw: n.to_string(),
                }),
                _ => Err(de::Error::custom(format!("number {} is out of range", n))),
            },
            Value::String(s) => Ok(MetricValue::from_cell(&s)),
            Value::Bool(b) => Ok(MetricValue::Text(b.to_string())),
            Value::Array(_) | Value::Object(_) => Err(de::Error::custom(
                "expected a number, string or null cell",
            )),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RecordError {
    #[error("entity identifier is empty")]
    EmptyIdentifier,
}

/// One ranked subject: a stable identifier plus its named metric values.
///
/// The identifier column is kept in `fields` as well so the record can be
/// rendered and exported column-for-column.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    id: String,
    fields: BTreeMap<String, MetricValue>,
}

impl EntityRecord {
    pub fn new(
        id: impl Into<String>,
        fields: BTreeMap<String, MetricValue>,
    ) -> Result<Self, RecordError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RecordError::EmptyIdentifier);
        }
        Ok(Self { id, fields })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &BTreeMap<String, MetricValue> {
        &self.fields
    }

    pub fn get(&self, metric: &str) -> Option<&MetricValue> {
        self.fields.get(metric)
    }

    /// Numeric value of `metric` for scoring; absent metrics yield 0.
    pub fn metric(&self, metric: &str) -> f64 {
        self.fields
            .get(metric)
            .map(MetricValue::score_input)
            .unwrap_or(0.0)
    }
}
