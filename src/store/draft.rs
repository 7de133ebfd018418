use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::config_store::{ConfigError, ConfigStore};
use crate::scoring::WeightConfig;

/// Uncommitted edits on top of a configuration snapshot.
///
/// Edits are raw values so a caller can collect free-text input and have
/// `commit` report every bad key at once. `None` marks a removed metric.
#[derive(Debug, Clone)]
pub struct ConfigDraft {
    base: Arc<WeightConfig>,
    edits: BTreeMap<String, Option<Value>>,
}

impl ConfigDraft {
    pub(crate) fn new(base: Arc<WeightConfig>) -> Self {
        Self {
            base,
            edits: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, metric: impl Into<String>, value: impl Into<Value>) {
        self.edits.insert(metric.into(), Some(value.into()));
    }

    pub fn remove(&mut self, metric: impl Into<String>) {
        self.edits.insert(metric.into(), None);
    }

    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
    }

    pub fn base(&self) -> &WeightConfig {
        &self.base
    }

    /// The full mapping that `commit` would submit.
    pub fn candidate(&self) -> BTreeMap<String, Value> {
        let mut candidate = self.base.to_candidate();
        for (metric, edit) in &self.edits {
            match edit {
                Some(value) => {
                    candidate.insert(metric.clone(), value.clone());
                }
                None => {
                    candidate.remove(metric);
                }
            }
        }
        candidate
    }

    /// Discard every uncommitted edit and return the configuration the
    /// draft started from.
    pub fn reset(&mut self) -> WeightConfig {
        self.edits.clear();
        self.base.as_ref().clone()
    }

    /// Submit the draft as a full replacement. On success the draft is
    /// rebased onto the stored result; on failure the edits are kept so the
    /// caller can fix the offending keys and retry.
    pub fn commit(&mut self, store: &ConfigStore) -> Result<WeightConfig, ConfigError> {
        let saved = store.update(&self.candidate())?;
        self.base = Arc::new(saved.clone());
        self.edits.clear();
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WeightPolicy;

    fn store() -> ConfigStore {
        let weights: WeightConfig = [("Chambers Rank", 2.0), ("Years PE", 1.5)]
            .into_iter()
            .collect();
        ConfigStore::in_memory(weights, WeightPolicy::default()).unwrap()
    }

    #[test]
    fn test_edits_merge_over_base() {
        let store = store();
        let mut draft = store.draft();
        draft.set("Years PE", "3");
        draft.remove("Chambers Rank");
        draft.set("Google News", 0.5);

        let candidate = draft.candidate();
        assert_eq!(candidate.len(), 2);
        assert_eq!(candidate["Years PE"], Value::from("3"));
        assert_eq!(candidate["Google News"], Value::from(0.5));
    }

    #[test]
    fn test_reset_discards_edits() {
        let store = store();
        let mut draft = store.draft();
        draft.set("Years PE", "not a number");
        assert!(draft.is_dirty());

        let restored = draft.reset();
        assert!(!draft.is_dirty());
        assert_eq!(restored, store.get());
        assert_eq!(draft.candidate(), store.get().to_candidate());
    }

    #[test]
    fn test_commit_success_rebases() {
        let store = store();
        let mut draft = store.draft();
        draft.set("Years PE", "4");

        let saved = draft.commit(&store).unwrap();
        assert_eq!(saved.get("Years PE"), Some(4.0));
        assert_eq!(store.get(), saved);
        assert!(!draft.is_dirty());
        assert_eq!(draft.base(), &saved);
    }

    #[test]
    fn test_commit_failure_keeps_edits() {
        let store = store();
        let before = store.get();
        let mut draft = store.draft();
        draft.set("Years PE", "abc");
        draft.set("Chambers Rank", 7);

        let err = draft.commit(&store).unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["Chambers Rank", "Years PE"]);
        assert!(draft.is_dirty());
        assert_eq!(store.get(), before);
    }
}
