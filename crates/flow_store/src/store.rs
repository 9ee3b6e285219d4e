//! Typed, versioned session documents.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use flow_core::{
    ArtifactBundle, CoreError, CoreResult, PendingArtifactJob, SimulationSink, SimulationState, WorkflowData,
};

use crate::backend::{FileBackend, MemoryBackend, StoreBackend};
use crate::error::{StoreError, StoreResult};

/// A value stored under a fixed key in each session.
pub trait Document: Serialize + DeserializeOwned {
    /// Storage key.
    const KEY: &'static str;
    /// Schema version. Stored documents with another version are ignored.
    const VERSION: u32;
}

impl Document for WorkflowData {
    const KEY: &'static str = "workflow";
    const VERSION: u32 = 1;
}

impl Document for ArtifactBundle {
    const KEY: &'static str = "artifact";
    const VERSION: u32 = 1;
}

impl Document for SimulationState {
    const KEY: &'static str = "simulation";
    const VERSION: u32 = 1;
}

impl Document for PendingArtifactJob {
    const KEY: &'static str = "pending_job";
    const VERSION: u32 = 1;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a, T> {
    version: u32,
    saved_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    version: u32,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    data: serde_json::Value,
}

/// Documents present in a session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub documents: Vec<String>,
}

/// Session store over a [`StoreBackend`].
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn StoreBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// File-backed store rooted at `root`.
    pub fn file(root: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileBackend::new(root)))
    }

    /// In-memory store.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Create a session with a fresh id.
    pub fn create_session(&self) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.backend.create(&id)?;
        debug!("Created session {}", id);
        Ok(id)
    }

    /// Create a session with a caller-chosen id if it does not exist yet.
    pub fn ensure_session(&self, id: &str) -> StoreResult<()> {
        validate_id(id)?;
        self.backend.create(id)
    }

    pub fn exists(&self, id: &str) -> StoreResult<bool> {
        validate_id(id)?;
        self.backend.exists(id)
    }

    /// Fail with [`StoreError::SessionNotFound`] when the session is absent.
    pub fn require(&self, id: &str) -> StoreResult<()> {
        if self.exists(id)? {
            Ok(())
        } else {
            Err(StoreError::SessionNotFound(id.to_string()))
        }
    }

    pub fn sessions(&self) -> StoreResult<Vec<String>> {
        self.backend.sessions()
    }

    pub fn summary(&self, id: &str) -> StoreResult<SessionSummary> {
        self.require(id)?;
        Ok(SessionSummary {
            id: id.to_string(),
            documents: self.backend.keys(id)?,
        })
    }

    /// Delete a session. Returns whether it existed.
    pub fn clear(&self, id: &str) -> StoreResult<bool> {
        validate_id(id)?;
        self.backend.clear(id)
    }

    /// Write `doc` under its key, replacing any previous version.
    pub fn save<D: Document>(&self, id: &str, doc: &D) -> StoreResult<()> {
        validate_id(id)?;
        let envelope = EnvelopeRef {
            version: D::VERSION,
            saved_at: Utc::now(),
            data: doc,
        };
        let contents = serde_json::to_string_pretty(&envelope)?;
        self.backend.write(id, D::KEY, &contents)
    }

    /// Read the document under `D::KEY`.
    ///
    /// Missing documents and documents written with another schema version
    /// both yield `None`.
    pub fn load<D: Document>(&self, id: &str) -> StoreResult<Option<D>> {
        validate_id(id)?;
        let Some(contents) = self.backend.read(id, D::KEY)? else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_str(&contents)?;
        if envelope.version != D::VERSION {
            warn!(
                "Ignoring {} for session {}: version {} (expected {})",
                D::KEY,
                id,
                envelope.version,
                D::VERSION
            );
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(envelope.data)?))
    }

    /// Remove the document under `D::KEY`. Returns whether it existed.
    pub fn remove<D: Document>(&self, id: &str) -> StoreResult<bool> {
        validate_id(id)?;
        self.backend.remove(id, D::KEY)
    }

    /// Persistence sink for one session's playback.
    pub fn simulation_sink(&self, id: &str) -> StoreResult<SessionSink> {
        validate_id(id)?;
        Ok(SessionSink {
            store: self.clone(),
            session_id: id.to_string(),
        })
    }
}

/// Session ids become directory names, so only a safe alphabet is accepted.
fn validate_id(id: &str) -> StoreResult<()> {
    let valid = !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(id.to_string()))
    }
}

/// Writes playback progress to a session.
#[derive(Clone)]
pub struct SessionSink {
    store: SessionStore,
    session_id: String,
}

#[async_trait]
impl SimulationSink for SessionSink {
    /// File writes are synced to disk, so they run on the blocking pool.
    async fn persist(&self, state: &SimulationState) -> CoreResult<()> {
        let store = self.store.clone();
        let session_id = self.session_id.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || store.save(&session_id, &state))
            .await
            .map_err(|e| CoreError::Persistence(e.to_string()))?
            .map_err(|e| CoreError::Persistence(e.to_string()))
    }
}
