//! Progress storage backends.
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::ProgressionStorage;
use crate::progression::ProgressionState;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// In-process storage; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    states: Arc<Mutex<HashMap<String, ProgressionState>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with stored progress.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Poisoned`] if a writer panicked.
    pub fn user_count(&self) -> Result<usize, StorageError> {
        Ok(self.states.lock().map_err(|_| StorageError::Poisoned)?.len())
    }
}

impl ProgressionStorage for MemoryStorage {
    type Error = StorageError;

    fn load_state(&self, user_id: &str) -> Result<Option<ProgressionState>, Self::Error> {
        let states = self.states.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(states.get(user_id).copied())
    }

    fn save_state(&self, user_id: &str, state: &ProgressionState) -> Result<(), Self::Error> {
        self.states
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .insert(user_id.to_string(), *state);
        Ok(())
    }
}

/// One JSON file per user under a directory.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `user_id`'s progress.
    #[must_use]
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir
            .join(format!("restarter.progress.{}.json", sanitize_user_id(user_id)))
    }
}

impl ProgressionStorage for FileStorage {
    type Error = StorageError;

    fn load_state(&self, user_id: &str) -> Result<Option<ProgressionState>, Self::Error> {
        let path = self.path_for(user_id);
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save_state(&self, user_id: &str, state: &ProgressionState) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(user_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Keep `[A-Za-z0-9_-]`, map everything else to `_`.
fn sanitize_user_id(user_id: &str) -> String {
    let cleaned: String = user_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}
