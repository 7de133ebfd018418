use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::{WeightPolicy, DEFAULT_MAX_WEIGHT};

/// Starting weight given to each metric when weights are first seeded.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Application configuration.
///
/// Example YAML:
/// ```yaml
/// data: /home/me/lawyer_data.csv
/// id_field: Name
/// max_weight: 5
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Lawyer dataset: CSV with a header row, or a JSON array of objects
    pub data: PathBuf,

    /// Identifier column (default: first of Name, name, id, ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,

    /// Persisted weights (default: weights.json next to the config file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights_file: Option<PathBuf>,

    /// Upper bound for any single weight (default: 5.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_weight: Option<f64>,

    /// Weight each metric starts with on first run (default: 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_weight: Option<f64>,

    /// Reject weights for metrics the dataset does not have (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_metrics: Option<bool>,
}

impl Config {
    pub fn new(data: impl Into<PathBuf>) -> Self {
        Self {
            data: data.into(),
            id_field: None,
            weights_file: None,
            max_weight: None,
            default_weight: None,
            strict_metrics: None,
        }
    }

    pub fn max_weight(&self) -> f64 {
        self.max_weight.unwrap_or(DEFAULT_MAX_WEIGHT)
    }

    pub fn default_weight(&self) -> f64 {
        self.default_weight.unwrap_or(DEFAULT_WEIGHT)
    }

    /// Weights file location; relative paths resolve against `config_dir`.
    pub fn weights_path(&self, config_dir: &Path) -> PathBuf {
        match self.weights_file {
            Some(ref path) => resolve(config_dir, path),
            None => config_dir.join("weights.json"),
        }
    }

    /// Dataset location; relative paths resolve against `config_dir`.
    pub fn data_path(&self, config_dir: &Path) -> PathBuf {
        resolve(config_dir, &self.data)
    }

    /// Validation policy for weight updates. `metrics` is the dataset's
    /// metric set, only enforced with `strict_metrics`.
    pub fn weight_policy(&self, metrics: &[String]) -> WeightPolicy {
        let policy = WeightPolicy::with_max(self.max_weight());
        if self.strict_metrics.unwrap_or(false) {
            policy.with_known_metrics(metrics.iter().cloned())
        } else {
            policy
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
