use std::sync::{Arc, Mutex, PoisonError};

use crate::entity::EntityRecord;
use crate::scoring::{rank, EngineError, RankedEntity};
use crate::store::ConfigStore;

struct CachedRanking {
    generation: u64,
    entities: Arc<Vec<EntityRecord>>,
    ranked: Arc<Vec<RankedEntity>>,
}

struct State {
    entities: Arc<Vec<EntityRecord>>,
    cache: Option<CachedRanking>,
}

/// Serves rankings for the current entity snapshot under the store's
/// current weights.
///
/// The last result is reused until the store reports a new generation or
/// the entities are replaced. Ranking itself runs outside the lock.
pub struct RankingService {
    store: Arc<ConfigStore>,
    state: Mutex<State>,
}

impl RankingService {
    pub fn new(store: Arc<ConfigStore>, entities: Vec<EntityRecord>) -> Self {
        Self {
            store,
            state: Mutex::new(State {
                entities: Arc::new(entities),
                cache: None,
            }),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn entities(&self) -> Arc<Vec<EntityRecord>> {
        self.lock().entities.clone()
    }

    pub fn replace_entities(&self, entities: Vec<EntityRecord>) {
        let mut state = self.lock();
        state.entities = Arc::new(entities);
        state.cache = None;
    }

    /// Ranked entities for the current weights.
    pub fn ranked(&self) -> Result<Arc<Vec<RankedEntity>>, EngineError> {
        let snapshot = self.store.snapshot();

        let entities = {
            let state = self.lock();
            if let Some(ref cached) = state.cache {
                if cached.generation == snapshot.generation
                    && Arc::ptr_eq(&cached.entities, &state.entities)
                {
                    return Ok(cached.ranked.clone());
                }
            }
            state.entities.clone()
        };

        tracing::debug!(
            generation = snapshot.generation,
            entities = entities.len(),
            "recomputing ranking"
        );
        let ranked = Arc::new(rank(&entities, &snapshot.weights)?);

        let mut state = self.lock();
        let newer_cached = state
            .cache
            .as_ref()
            .is_some_and(|c| c.generation > snapshot.generation);
        if Arc::ptr_eq(&state.entities, &entities) && !newer_cached {
            state.cache = Some(CachedRanking {
                generation: snapshot.generation,
                entities,
                ranked: ranked.clone(),
            });
        }

        Ok(ranked)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
