use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::scoring::WeightConfig;

/// Where the authoritative weights live between runs.
///
/// `load` returns the raw mapping so the store can validate it the same way
/// it validates user input; `Ok(None)` means nothing has been saved yet.
pub trait WeightStorage: Send + Sync {
    fn load(&self) -> Result<Option<BTreeMap<String, Value>>>;
    fn save(&self, weights: &WeightConfig) -> Result<()>;
}

/// Flat JSON object on disk, written atomically.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WeightStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<BTreeMap<String, Value>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open weights file at {}", self.path.display()))?;

        let raw: BTreeMap<String, Value> = serde_json::from_reader(file).with_context(|| {
            format!(
                "Failed to parse weights: invalid JSON in {}",
                self.path.display()
            )
        })?;

        Ok(Some(raw))
    }

    /// Never leaves a half-written file behind.
    fn save(&self, weights: &WeightConfig) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create weights directory at {}", parent.display())
            })?;
        }

        let mut file = AtomicWriteFile::open(&self.path).with_context(|| {
            format!("Failed to open atomic write file at {}", self.path.display())
        })?;

        serde_json::to_writer_pretty(&mut file, weights).context("Failed to serialize weights")?;

        file.commit().context("Failed to save weights")?;

        tracing::debug!(path = %self.path.display(), metrics = weights.len(), "weights saved");
        Ok(())
    }
}

/// Keeps the last saved configuration in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saved: Mutex<Option<WeightConfig>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<WeightConfig> {
        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl WeightStorage for MemoryStorage {
    fn load(&self) -> Result<Option<BTreeMap<String, Value>>> {
        Ok(self.saved().map(|weights| weights.to_candidate()))
    }

    fn save(&self, weights: &WeightConfig) -> Result<()> {
        *self
            .saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(weights.clone());
        Ok(())
    }
}

/// Shared handle, so the caller can keep inspecting a storage the store owns.
impl<S: WeightStorage + ?Sized> WeightStorage for Arc<S> {
    fn load(&self) -> Result<Option<BTreeMap<String, Value>>> {
        (**self).load()
    }

    fn save(&self, weights: &WeightConfig) -> Result<()> {
        (**self).save(weights)
    }
}
