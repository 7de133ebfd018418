pub mod config_store;
pub mod draft;
pub mod storage;
pub mod validation;

pub use config_store::{ConfigError, ConfigStore, Snapshot};
pub use draft::ConfigDraft;
pub use storage::{JsonFileStorage, MemoryStorage, WeightStorage};
pub use validation::{
    validate_weights, WeightIssue, WeightPolicy, WeightProblem, DEFAULT_MAX_WEIGHT,
};
