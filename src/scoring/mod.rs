pub mod engine;
pub mod weights;

pub use engine::{
    calculate_score, check_weights, rank, EngineError, MetricContribution, RankedEntity,
    ScoreBreakdown, ScoreResult,
};
pub use weights::WeightConfig;
