//! Storage backends.
//!
//! The file backend keeps one directory per session:
//!
//! ```text
//! <root>/.flowmaster/sessions/<sessionId>/
//! ├── workflow.json      # Generated workflow
//! ├── artifact.json      # Last viewed artifact bundle
//! ├── simulation.json    # Playback progress
//! └── pending_job.json   # Artifact job hand-off
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tempfile::NamedTempFile;

use crate::error::StoreResult;

/// Raw key/value storage scoped by session.
pub trait StoreBackend: Send + Sync {
    /// Make sure the session exists.
    fn create(&self, session: &str) -> StoreResult<()>;

    /// Whether the session exists.
    fn exists(&self, session: &str) -> StoreResult<bool>;

    fn read(&self, session: &str, key: &str) -> StoreResult<Option<String>>;

    /// Replace a document. Readers observe the old or the new contents, never a mix.
    fn write(&self, session: &str, key: &str, contents: &str) -> StoreResult<()>;

    /// Remove a document. Returns whether it existed.
    fn remove(&self, session: &str, key: &str) -> StoreResult<bool>;

    /// Document keys present in a session.
    fn keys(&self, session: &str) -> StoreResult<Vec<String>>;

    /// Remove a session and all of its documents. Returns whether it existed.
    fn clear(&self, session: &str) -> StoreResult<bool>;

    /// All session ids, sorted.
    fn sessions(&self) -> StoreResult<Vec<String>>;
}

/// JSON files under a workspace root.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join(".flowmaster").join("sessions")
    }

    fn session_dir(&self, session: &str) -> PathBuf {
        self.sessions_dir().join(session)
    }

    fn document_path(&self, session: &str, key: &str) -> PathBuf {
        self.session_dir(session).join(format!("{}.json", key))
    }
}

impl StoreBackend for FileBackend {
    fn create(&self, session: &str) -> StoreResult<()> {
        fs::create_dir_all(self.session_dir(session))?;
        Ok(())
    }

    fn exists(&self, session: &str) -> StoreResult<bool> {
        Ok(self.session_dir(session).is_dir())
    }

    fn read(&self, session: &str, key: &str) -> StoreResult<Option<String>> {
        let path = self.document_path(session, key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, session: &str, key: &str, contents: &str) -> StoreResult<()> {
        let dir = self.session_dir(session);
        fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(self.document_path(session, key))?;
        Ok(())
    }

    fn remove(&self, session: &str, key: &str) -> StoreResult<bool> {
        let path = self.document_path(session, key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    fn keys(&self, session: &str) -> StoreResult<Vec<String>> {
        let dir = self.session_dir(session);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear(&self, session: &str) -> StoreResult<bool> {
        let dir = self.session_dir(session);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(dir)?;
        Ok(true)
    }

    fn sessions(&self) -> StoreResult<Vec<String>> {
        let dir = self.sessions_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// In-process storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sessions: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn create(&self, session: &str) -> StoreResult<()> {
        self.sessions.write().entry(session.to_string()).or_default();
        Ok(())
    }

    fn exists(&self, session: &str) -> StoreResult<bool> {
        Ok(self.sessions.read().contains_key(session))
    }

    fn read(&self, session: &str, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .sessions
            .read()
            .get(session)
            .and_then(|docs| docs.get(key).cloned()))
    }

    fn write(&self, session: &str, key: &str, contents: &str) -> StoreResult<()> {
        self.sessions
            .write()
            .entry(session.to_string())
            .or_default()
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, session: &str, key: &str) -> StoreResult<bool> {
        Ok(self
            .sessions
            .write()
            .get_mut(session)
            .and_then(|docs| docs.remove(key))
            .is_some())
    }

    fn keys(&self, session: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .sessions
            .read()
            .get(session)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn clear(&self, session: &str) -> StoreResult<bool> {
        Ok(self.sessions.write().remove(session).is_some())
    }

    fn sessions(&self) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
