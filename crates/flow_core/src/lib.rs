//! # flow_core
//!
//! Core library for FlowMaster.
//!
//! This crate holds the workflow data model, the playback engine that replays
//! agent phases as a paced message feed, and the extraction utility that
//! recovers JSON from model output.
//!
//! # Architecture
//!
//! - **Models**: agents, phases, messages, artifacts and persisted documents
//! - **Playback**: pure state machine plus an async driver
//! - **Pacing**: per-phase delay profiles
//! - **Extract**: bounded JSON recovery for LLM responses
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use flow_core::{NullSink, PlaybackMachine, PlaybackOptions, PlaybackSession};
//!
//! let machine = PlaybackMachine::new(agents, PlaybackOptions::default());
//! let handle = PlaybackSession::spawn(machine, Arc::new(NullSink));
//! handle.start()?;
//! let snapshot = handle.wait_until(|s| s.pending_approval.is_some()).await?;
//! handle.approve_step(snapshot.pending_approval.unwrap_or_default())?;
//! ```

pub mod error;
pub mod extract;
pub mod models;
pub mod pacing;
pub mod playback;

pub use error::{CoreError, CoreResult};
pub use extract::{extract_as, extract_json, extract_json_with, ExtractError, ExtractResult, RepairLimits};
pub use models::{
    message_id, Agent, ArtifactBundle, ArtifactKind, ClarifiedBrief, CodeFile, Issue, Message, MessageKind,
    PendingArtifactJob, Phase, PhaseType, SimulationState, Wireframe, WorkflowData,
};
pub use pacing::{DelayRange, PacingProfile};
pub use playback::{
    NullSink, PlaybackEffect, PlaybackEvent, PlaybackHandle, PlaybackMachine, PlaybackOptions, PlaybackSession,
    PlaybackSnapshot, PlaybackStatus, SimulationSink,
};
