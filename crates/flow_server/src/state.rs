//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use flow_agents::{AgentStudio, WireframeCatalog};
use flow_core::{
    PacingProfile, PlaybackHandle, PlaybackMachine, PlaybackOptions, PlaybackSession, SimulationState, WorkflowData,
};
use flow_llm::ProviderChain;
use flow_store::SessionStore;

use crate::config::FlowConfig;
use crate::error::{ApiError, ServerResult};

/// State shared by all workers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FlowConfig>,
    pub store: SessionStore,
    pub studio: AgentStudio,
    pub playbacks: PlaybackRegistry,
}

impl AppState {
    pub fn new(config: FlowConfig, store: SessionStore, studio: AgentStudio) -> Self {
        Self {
            config: Arc::new(config),
            store,
            studio,
            playbacks: PlaybackRegistry::default(),
        }
    }

    /// Build the store, provider chain and studio described by `config`.
    pub fn from_config(config: FlowConfig) -> ServerResult<Self> {
        let store = config.open_store();
        let chain = ProviderChain::from_settings(&config.llm);
        let mut catalog = WireframeCatalog::new();
        if let Some(dir) = &config.server.assets_dir {
            catalog = catalog.with_assets_dir(dir);
        }
        let studio = AgentStudio::builtin(chain)?.with_catalog(catalog);
        Ok(Self::new(config, store, studio))
    }

    /// Load the session's workflow or ask the client to start over.
    pub fn require_workflow(&self, session_id: &str) -> Result<WorkflowData, ApiError> {
        self.store.require(session_id)?;
        self.store
            .load::<WorkflowData>(session_id)?
            .ok_or_else(|| ApiError::redirect("No workflow stored for this session", "/"))
    }
}

/// Playback start parameters.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackStart {
    pub profile: PacingProfile,
    pub auto_approve: bool,
}

/// Live playback tasks keyed by session id.
#[derive(Clone, Default)]
pub struct PlaybackRegistry {
    handles: Arc<Mutex<HashMap<String, PlaybackHandle>>>,
}

impl PlaybackRegistry {
    /// The running playback for a session, if its task is still alive.
    pub fn get(&self, session_id: &str) -> Option<PlaybackHandle> {
        let mut handles = self.handles.lock();
        match handles.get(session_id) {
            Some(handle) if !handle.is_closed() => Some(handle.clone()),
            Some(_) => {
                handles.remove(session_id);
                None
            }
            None => None,
        }
    }

    /// Return the running playback or spawn one restored from the store.
    pub fn start(
        &self,
        store: &SessionStore,
        session_id: &str,
        workflow: WorkflowData,
        params: PlaybackStart,
    ) -> Result<PlaybackHandle, ApiError> {
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(session_id).filter(|h| !h.is_closed()) {
            return Ok(handle.clone());
        }

        let saved = store.load::<SimulationState>(session_id)?;
        let options = PlaybackOptions::default()
            .with_profile(params.profile)
            .with_auto_approve(params.auto_approve);
        let machine = PlaybackMachine::restore(workflow.agent_workflow, saved, options);
        if machine.was_restored() {
            debug!("Restored playback for session {}", session_id);
        }

        let sink = Arc::new(store.simulation_sink(session_id)?);
        let handle = PlaybackSession::spawn(machine, sink);
        handle.start()?;
        info!("Started playback for session {} ({} profile)", session_id, params.profile);

        handles.insert(session_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Stop and forget a session's playback, waiting for its task to exit.
    /// Returns whether one was running.
    pub async fn stop(&self, session_id: &str) -> bool {
        let handle = self.handles.lock().remove(session_id);
        match handle {
            Some(handle) => {
                handle.stop().await;
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> usize {
        self.handles.lock().values().filter(|h| !h.is_closed()).count()
    }
}
