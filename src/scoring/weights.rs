use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weight per metric name.
///
/// Persisted as a flat JSON object, e.g.:
/// ```json
/// { "Chambers Rank": 2.0, "Years PE": 1.5, "LinkedIn Presence": 1.0 }
/// ```
///
/// Metrics without an entry contribute nothing to a score, so a weight of 0
/// and an absent key rank identically. Range checks live in the config store;
/// this type only carries values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightConfig {
    weights: BTreeMap<String, f64>,
}

impl WeightConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.weights.get(metric).copied()
    }

    pub fn insert(&mut self, metric: impl Into<String>, weight: f64) -> Option<f64> {
        self.weights.insert(metric.into(), weight)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Candidate form accepted by `ConfigStore::update`.
    pub fn to_candidate(&self) -> BTreeMap<String, serde_json::Value> {
        self.weights
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(*v)))
            .collect()
    }
}

impl FromIterator<(String, f64)> for WeightConfig {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, f64)> for WeightConfig {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_json_roundtrip() {
        let weights: WeightConfig = [("Chambers Rank", 2.0), ("Years PE", 1.5)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&weights).unwrap();
        assert_eq!(json, r#"{"Chambers Rank":2.0,"Years PE":1.5}"#);

        let parsed: WeightConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, weights);
    }

    #[test]
    fn test_integer_json_parses() {
        let parsed: WeightConfig = serde_json::from_str(r#"{"Metric": 2}"#).unwrap();
        assert_eq!(parsed.get("Metric"), Some(2.0));
    }

    #[test]
    fn test_candidate_form() {
        let weights: WeightConfig = [("Metric", 0.5)].into_iter().collect();
        let candidate = weights.to_candidate();
        assert_eq!(candidate["Metric"], serde_json::json!(0.5));
    }

    #[test]
    fn test_order_irrelevant() {
        let a: WeightConfig = [("x", 1.0), ("y", 2.0)].into_iter().collect();
        let b: WeightConfig = [("y", 2.0), ("x", 1.0)].into_iter().collect();
        assert_eq!(a, b);
    }
}
