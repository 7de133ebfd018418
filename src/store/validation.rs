use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::scoring::WeightConfig;

/// Default upper bound for a single weight.
pub const DEFAULT_MAX_WEIGHT: f64 = 5.0;

/// Rules a candidate weight mapping must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightPolicy {
    pub min: f64,
    pub max: f64,
    /// When set, keys outside this set are rejected.
    pub known_metrics: Option<BTreeSet<String>>,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: DEFAULT_MAX_WEIGHT,
            known_metrics: None,
        }
    }
}

impl WeightPolicy {
    pub fn with_max(max: f64) -> Self {
        Self {
            max,
            ..Self::default()
        }
    }

    pub fn with_known_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_metrics = Some(metrics.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightProblem {
    #[error("'{0}' is not a number")]
    NotNumeric(String),
    #[error("{0} is not a finite number")]
    NotFinite(f64),
    #[error("{value} is outside the allowed range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("no such metric in the dataset")]
    UnknownMetric,
    #[error("metric name is blank")]
    BlankKey,
}

/// One rejected key and why.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightIssue {
    pub key: String,
    pub problem: WeightProblem,
}

impl fmt::Display for WeightIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.problem)
    }
}

/// Validate a candidate mapping into a `WeightConfig`.
/// Returns every problem at once (not just the first).
pub fn validate_weights(
    candidate: &BTreeMap<String, Value>,
    policy: &WeightPolicy,
) -> Result<WeightConfig, Vec<WeightIssue>> {
    let mut issues = Vec::new();
    let mut weights = WeightConfig::new();

    for (key, raw) in candidate {
        let issue = |problem| WeightIssue {
            key: key.clone(),
            problem,
        };

        if key.trim().is_empty() {
            issues.push(issue(WeightProblem::BlankKey));
            continue;
        }

        if let Some(ref known) = policy.known_metrics {
            if !known.contains(key) {
                issues.push(issue(WeightProblem::UnknownMetric));
                continue;
            }
        }

        let value = match parse_weight(raw) {
            Ok(v) => v,
            Err(problem) => {
                issues.push(issue(problem));
                continue;
            }
        };

        if value < policy.min || value > policy.max {
            issues.push(issue(WeightProblem::OutOfRange {
                value,
                min: policy.min,
                max: policy.max,
            }));
            continue;
        }

        weights.insert(key.clone(), value);
    }

    if issues.is_empty() {
        Ok(weights)
    } else {
        Err(issues)
    }
}

/// Numbers pass through; strings must parse as a real after trimming.
fn parse_weight(raw: &Value) -> Result<f64, WeightProblem> {
    let value = match raw {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| WeightProblem::NotNumeric(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| WeightProblem::NotNumeric(s.clone()))?,
        other => return Err(WeightProblem::NotNumeric(other.to_string())),
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(WeightProblem::NotFinite(value))
    }
}
