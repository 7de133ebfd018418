use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::draft::ConfigDraft;
use super::storage::{MemoryStorage, WeightStorage};
use super::validation::{validate_weights, WeightIssue, WeightPolicy};
use crate::scoring::WeightConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid weight values: {}", join_issues(.0))]
    InvalidWeightValue(Vec<WeightIssue>),
    #[error("failed to persist weights: {0:#}")]
    Persist(anyhow::Error),
    #[error("failed to load weights: {0:#}")]
    Load(anyhow::Error),
}

impl ConfigError {
    /// Keys rejected by validation, in key order. Empty for I/O failures.
    pub fn invalid_keys(&self) -> Vec<&str> {
        match self {
            ConfigError::InvalidWeightValue(issues) => {
                issues.iter().map(|i| i.key.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_issues(issues: &[WeightIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// An immutable view of the store at one point in time.
///
/// `generation` increases with every successful update, so anything derived
/// from `weights` is stale once the store reports a newer generation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub weights: Arc<WeightConfig>,
}

/// Owner of the authoritative weight configuration.
///
/// Readers take a shared lock just long enough to clone an `Arc`; writers are
/// serialised by a separate mutex held across validate, persist and swap, so
/// a reader sees either the old configuration or the new one, never a mix.
pub struct ConfigStore {
    current: RwLock<Snapshot>,
    write_lock: Mutex<()>,
    policy: WeightPolicy,
    storage: Box<dyn WeightStorage>,
    load_issues: Vec<WeightIssue>,
}

impl ConfigStore {
    /// Load persisted weights, or seed and persist `defaults` on first run.
    ///
    /// Persisted weights that violate `policy` (after `max_weight` is
    /// lowered, say) do not block startup: the store serves `defaults`
    /// without writing them, and `load_issues` lists what was wrong. The
    /// file is replaced by the next successful `update`.
    ///
    /// # Errors
    ///
    /// - `Load` if the storage cannot be read
    /// - `InvalidWeightValue` if `defaults` themselves violate `policy`
    /// - `Persist` if seeding the defaults fails
    pub fn open(
        storage: Box<dyn WeightStorage>,
        policy: WeightPolicy,
        defaults: impl FnOnce() -> WeightConfig,
    ) -> Result<Self, ConfigError> {
        let seed = |defaults: WeightConfig| {
            validate_weights(&defaults.to_candidate(), &policy)
                .map_err(ConfigError::InvalidWeightValue)
        };

        let (weights, load_issues) = match storage.load().map_err(ConfigError::Load)? {
            Some(raw) => match validate_weights(&raw, &policy) {
                Ok(weights) => (weights, Vec::new()),
                Err(issues) => {
                    tracing::warn!(
                        count = issues.len(),
                        "persisted weights are invalid, serving defaults until next update"
                    );
                    (seed(defaults())?, issues)
                }
            },
            None => {
                let seeded = seed(defaults())?;
                storage.save(&seeded).map_err(ConfigError::Persist)?;
                tracing::info!(metrics = seeded.len(), "seeded default weights");
                (seeded, Vec::new())
            }
        };

        let mut store = Self::with_weights(weights, policy, storage);
        store.load_issues = load_issues;
        Ok(store)
    }

    /// Store that persists nothing beyond the process, starting at `initial`.
    pub fn in_memory(initial: WeightConfig, policy: WeightPolicy) -> Result<Self, ConfigError> {
        let weights = validate_weights(&initial.to_candidate(), &policy)
            .map_err(ConfigError::InvalidWeightValue)?;
        Ok(Self::with_weights(
            weights,
            policy,
            Box::new(MemoryStorage::new()),
        ))
    }

    fn with_weights(
        weights: WeightConfig,
        policy: WeightPolicy,
        storage: Box<dyn WeightStorage>,
    ) -> Self {
        Self {
            current: RwLock::new(Snapshot {
                generation: 0,
                weights: Arc::new(weights),
            }),
            write_lock: Mutex::new(()),
            policy,
            storage,
            load_issues: Vec::new(),
        }
    }

    /// Owned copy of the current configuration.
    pub fn get(&self) -> WeightConfig {
        self.snapshot().weights.as_ref().clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    pub fn policy(&self) -> &WeightPolicy {
        &self.policy
    }

    /// Problems found in the persisted weights by `open`. Non-empty means
    /// the store started from defaults instead.
    pub fn load_issues(&self) -> &[WeightIssue] {
        &self.load_issues
    }

    /// Replace the whole configuration with `candidate`.
    ///
    /// Every key is validated before anything is written; on any problem the
    /// full list of offending keys is returned and the store is untouched.
    /// The new weights are persisted before they become visible to readers.
    pub fn update(
        &self,
        candidate: &BTreeMap<String, Value>,
    ) -> Result<WeightConfig, ConfigError> {
        let weights = validate_weights(candidate, &self.policy).map_err(|issues| {
            tracing::warn!(count = issues.len(), "rejected weight update");
            ConfigError::InvalidWeightValue(issues)
        })?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.storage.save(&weights).map_err(|e| {
            tracing::error!(error = %format!("{:#}", e), "failed to persist weights");
            ConfigError::Persist(e)
        })?;

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = current.generation + 1;
        *current = Snapshot {
            generation,
            weights: Arc::new(weights.clone()),
        };
        drop(current);

        tracing::info!(generation, metrics = weights.len(), "weights updated");
        Ok(weights)
    }

    /// Start an editing session against the current configuration.
    pub fn draft(&self) -> ConfigDraft {
        ConfigDraft::new(self.snapshot().weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    struct FailingStorage;

    impl WeightStorage for FailingStorage {
        fn load(&self) -> anyhow::Result<Option<BTreeMap<String, Value>>> {
            Ok(None)
        }

        fn save(&self, _weights: &WeightConfig) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    fn candidate(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn initial() -> WeightConfig {
        [("Chambers Rank", 2.0), ("Years PE", 1.5), ("LinkedIn Presence", 1.0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_update_then_get_roundtrip() {
        let store = ConfigStore::in_memory(initial(), WeightPolicy::default()).unwrap();
        let updated = store
            .update(&candidate(json!({
                "Chambers Rank": 3,
                "Years PE": "2",
                "LinkedIn Presence": 1.5
            })))
            .unwrap();

        let expected: WeightConfig = [
            ("Chambers Rank", 3.0),
            ("Years PE", 2.0),
            ("LinkedIn Presence", 1.5),
        ]
        .into_iter()
        .collect();
        assert_eq!(updated, expected);
        assert_eq!(store.get(), expected);
    }

    #[test]
    fn test_rejected_update_leaves_config_unchanged() {
        let store = ConfigStore::in_memory(initial(), WeightPolicy::default()).unwrap();
        let before = store.get();

        let err = store
            .update(&candidate(json!({"Chambers Rank": "abc"})))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidWeightValue(_)));
        assert_eq!(err.invalid_keys(), vec!["Chambers Rank"]);
        assert_eq!(store.get(), before);
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_all_invalid_keys_reported() {
        let store = ConfigStore::in_memory(initial(), WeightPolicy::default()).unwrap();
        let err = store
            .update(&candidate(json!({"a": "x", "b": 9, "c": 1})))
            .unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["a", "b"]);
        assert!(err.to_string().contains("a: 'x' is not a number"));
    }

    #[test]
    fn test_update_replaces_whole_config() {
        let store = ConfigStore::in_memory(initial(), WeightPolicy::default()).unwrap();
        store.update(&candidate(json!({"Years PE": 1}))).unwrap();

        let current = store.get();
        assert_eq!(current.len(), 1);
        assert_eq!(current.get("Chambers Rank"), None);
    }

    #[test]
    fn test_empty_update_accepted() {
        let store = ConfigStore::in_memory(initial(), WeightPolicy::default()).unwrap();
        let updated = store.update(&BTreeMap::new()).unwrap();
        assert!(updated.is_empty());
    }

    #[test]
    fn test_generation_bumps_on_success_only() {
        let store = ConfigStore::in_memory(initial(), WeightPolicy::default()).unwrap();
        assert_eq!(store.generation(), 0);
        store.update(&candidate(json!({"Years PE": 1}))).unwrap();
        assert_eq!(store.generation(), 1);
        let _ = store.update(&candidate(json!({"Years PE": -1})));
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_get_returns_copy() {
        let store = ConfigStore::in_memory(initial(), WeightPolicy::default()).unwrap();
        let mut copy = store.get();
        copy.insert("Chambers Rank", 4.0);
        assert_eq!(store.get().get("Chambers Rank"), Some(2.0));
    }

    #[test]
    fn test_persist_failure_leaves_config_unchanged() {
        let store = ConfigStore::with_weights(
            initial(),
            WeightPolicy::default(),
            Box::new(FailingStorage),
        );
        let err = store.update(&candidate(json!({"Years PE": 1}))).unwrap_err();

        assert!(matches!(err, ConfigError::Persist(_)));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(store.get(), initial());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_open_seeds_defaults_once() {
        let storage = MemoryStorage::new();
        storage.save(&initial()).unwrap();
        let store = ConfigStore::open(Box::new(storage), WeightPolicy::default(), || {
            panic!("defaults must not be used when weights exist")
        })
        .unwrap();
        assert_eq!(store.get(), initial());

        let fresh = ConfigStore::open(
            Box::new(MemoryStorage::new()),
            WeightPolicy::default(),
            initial,
        )
        .unwrap();
        assert_eq!(fresh.get(), initial());
    }

    #[test]
    fn test_open_falls_back_on_invalid_persisted_weights() {
        let storage = Arc::new(MemoryStorage::new());
        let too_heavy: WeightConfig = [("Years PE", 4.0)].into_iter().collect();
        storage.save(&too_heavy).unwrap();

        let store = ConfigStore::open(
            Box::new(Arc::clone(&storage)),
            WeightPolicy::with_max(3.0),
            initial_within_three,
        )
        .unwrap();

        assert_eq!(store.get(), initial_within_three());
        let keys: Vec<&str> = store.load_issues().iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Years PE"]);
        // Nothing written until the user saves
        assert_eq!(storage.saved(), Some(too_heavy));

        let repaired = store.update(&candidate(json!({"Years PE": 3}))).unwrap();
        assert_eq!(storage.saved(), Some(repaired));

        let reopened = ConfigStore::open(
            Box::new(Arc::clone(&storage)),
            WeightPolicy::with_max(3.0),
            || panic!("defaults must not be used once weights are valid"),
        )
        .unwrap();
        assert!(reopened.load_issues().is_empty());
        assert_eq!(reopened.get().get("Years PE"), Some(3.0));
    }

    fn initial_within_three() -> WeightConfig {
        [("Chambers Rank", 2.0), ("Years PE", 1.5)].into_iter().collect()
    }

    #[test]
    fn test_open_seed_failure() {
        let result =
            ConfigStore::open(Box::new(FailingStorage), WeightPolicy::default(), initial);
        assert!(matches!(result, Err(ConfigError::Persist(_))));
    }

    #[test]
    fn test_concurrent_readers_see_whole_configs() {
        let a: WeightConfig = [("x", 1.0), ("y", 1.0)].into_iter().collect();
        let b: WeightConfig = [("x", 2.0), ("y", 2.0)].into_iter().collect();
        let store = ConfigStore::in_memory(a.clone(), WeightPolicy::default()).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..200 {
                    let next = if i % 2 == 0 { &b } else { &a };
                    store.update(&next.to_candidate()).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let seen = store.get();
                        assert!(seen == a || seen == b, "observed a mixed configuration");
                    }
                });
            }
        });

        assert_eq!(store.generation(), 200);
    }
}
