use serde::ser::{Serialize, SerializeMap, Serializer};

use super::weights::WeightConfig;
use crate::entity::EntityRecord;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EngineError {
    #[error("malformed weight configuration: '{metric}' has non-finite weight {weight}")]
    MalformedConfig { metric: String, weight: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricContribution {
    pub metric: String,
    pub value: f64, // Coerced metric value (0 when missing)
    pub weight: f64,
    pub contribution: f64, // value * weight
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub contributions: Vec<MetricContribution>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// An entity with its composite score and 1-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntity {
    pub rank: usize,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub record: EntityRecord,
}

/// Serialises as the record's fields plus `rank` and `score`.
impl Serialize for RankedEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.record.fields();
        let mut map = serializer.serialize_map(Some(fields.len() + 2))?;
        map.serialize_entry("rank", &self.rank)?;
        map.serialize_entry("score", &self.score)?;
        for (key, value) in fields {
            if key != "rank" && key != "score" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Reject configurations that carry non-finite weights.
///
/// The config store never produces such values; reaching here means an
/// upstream contract was broken, so the error is logged and returned.
pub fn check_weights(weights: &WeightConfig) -> Result<(), EngineError> {
    for (metric, weight) in weights.iter() {
        if !weight.is_finite() {
            tracing::error!(metric, weight, "refusing to rank with malformed weight");
            return Err(EngineError::MalformedConfig {
                metric: metric.to_string(),
                weight,
            });
        }
    }
    Ok(())
}

/// Weighted sum over the metrics named in `weights`.
///
/// Metrics the entity lacks, or whose text holds no number, contribute 0.
/// Metrics the entity has but `weights` does not name are ignored. A sum
/// that overflows to infinity or NaN scores 0.
pub fn calculate_score(entity: &EntityRecord, weights: &WeightConfig) -> ScoreResult {
    let mut score = 0.0;
    let mut contributions = Vec::with_capacity(weights.len());

    for (metric, weight) in weights.iter() {
        let value = entity.metric(metric);
        let contribution = weight * value;
        score += contribution;
        contributions.push(MetricContribution {
            metric: metric.to_string(),
            value,
            weight,
            contribution,
        });
    }

    if !score.is_finite() {
        tracing::warn!(entity = entity.id(), score, "score overflowed, using 0");
        score = 0.0;
    }

    ScoreResult {
        score,
        breakdown: ScoreBreakdown { contributions },
    }
}

/// Score every entity and order by descending score.
///
/// Entities with equal scores keep their input order, and ranks are assigned
/// 1-based from the sorted position. Identical inputs always produce
/// identical output.
pub fn rank(
    entities: &[EntityRecord],
    weights: &WeightConfig,
) -> Result<Vec<RankedEntity>, EngineError> {
    check_weights(weights)?;

    let mut scored: Vec<(&EntityRecord, ScoreResult)> = entities
        .iter()
        .map(|entity| (entity, calculate_score(entity, weights)))
        .collect();

    // sort_by is stable, which gives the input-order tie-break
    scored.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

    Ok(scored
        .into_iter()
        .enumerate()
        .map(|(i, (entity, result))| RankedEntity {
            rank: i + 1,
            score: result.score,
            breakdown: result.breakdown,
            record: entity.clone(),
        })
        .collect())
}
