//! File-based poll state store — one human-readable JSON document.
//! Reads never fail (missing or corrupt file = empty state); writes go to a
//! sibling temp file that is renamed over the target, so a reader sees
//! either the old document or the new one.

use rollcall_core::error::{Result, RollcallError};
use rollcall_core::traits::PollStore;
use rollcall_core::types::PollState;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// JSON file store.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PollStore for JsonFileStore {
    fn load(&self) -> PollState {
        if !self.path.exists() {
            return PollState::default();
        }
        match std::fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("⚠️ Failed to parse {}: {e}", self.path.display());
                PollState::default()
            }),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read {}: {e}", self.path.display());
                PollState::default()
            }
        }
    }

    fn save(&self, state: &PollState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| RollcallError::Storage(format!("Serialize error: {e}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| RollcallError::Storage(format!("Create dir error: {e}")))?;
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, &json)
            .map_err(|e| RollcallError::Storage(format!("Write error: {e}")))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            std::fs::remove_file(&tmp).ok();
            RollcallError::Storage(format!("Rename error: {e}"))
        })?;

        tracing::debug!(
            "💾 Saved poll state ({} answers) to {}",
            state.answers.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<PollState>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state.
    pub fn with_state(state: PollState) -> Self {
        Self {
            state: Mutex::new(state),
            fail_saves: false,
        }
    }

    /// A store whose every `save` fails, to exercise write-error paths.
    pub fn failing(state: PollState) -> Self {
        Self {
            state: Mutex::new(state),
            fail_saves: true,
        }
    }
}

impl PollStore for MemoryStore {
    fn load(&self) -> PollState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn save(&self, state: &PollState) -> Result<()> {
        if self.fail_saves {
            return Err(RollcallError::Storage("Write error: store is read-only".into()));
        }
        let mut guard = self
            .state
            .lock()
            .map_err(|_| RollcallError::Storage("Memory store poisoned".into()))?;
        *guard = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rollcall_core::types::AnswerRecord;

    fn sample() -> PollState {
        let mut state =
            PollState::for_new_poll("poll-1", NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        state.answers.insert("1".into(), AnswerRecord::new("Ana", [0]));
        state.answers.insert("2".into(), AnswerRecord::new("Bob Smith", [1]));
        state
    }

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("database.json"));
        assert_eq!(store.load(), PollState::default());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("database.json"));
        let state = sample();
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);

        // Absent optional fields survive too
        store.save(&PollState::default()).unwrap();
        assert_eq!(store.load(), PollState::default());
    }

    #[test]
    fn test_corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert_eq!(store.load(), PollState::default());
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("database.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample()).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("nested").join("database.json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("database.json"));
        store.save(&sample()).unwrap();
        let fresh =
            PollState::for_new_poll("poll-2", NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        store.save(&fresh).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.poll_id.as_deref(), Some("poll-2"));
        assert!(loaded.answers.is_empty());
    }

    #[test]
    fn test_save_fails_when_target_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("database.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let store = JsonFileStore::new(&path);
        let err = store.save(&sample()).unwrap_err();
        assert!(matches!(err, RollcallError::Storage(_)));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.load(), PollState::default());
        store.save(&sample()).unwrap();
        assert_eq!(store.load(), sample());

        let failing = MemoryStore::failing(sample());
        assert!(failing.save(&PollState::default()).is_err());
        assert_eq!(failing.load(), sample());
    }
}
