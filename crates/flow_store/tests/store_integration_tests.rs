//! Integration tests for the file-backed session store.

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use flow_core::{
    Agent, ArtifactBundle, ClarifiedBrief, CodeFile, PacingProfile, Phase, PhaseType, PlaybackHandle,
    PlaybackMachine, PlaybackOptions, PlaybackSession, SimulationState, WorkflowData,
};
use flow_store::{SessionStore, StoreError};

fn sample_workflow() -> WorkflowData {
    WorkflowData {
        user_prompt: "Build a todo app".to_string(),
        project_name: "TodoFlow".to_string(),
        clarified_brief: ClarifiedBrief {
            title: "TodoFlow".to_string(),
            description: "A focused task manager".to_string(),
        },
        agent_workflow: vec![Agent::new(1, "CEO Agent", "Defines vision and strategy", "#00d4ff")
            .with_phase(Phase::new(PhaseType::InitialOutput).with_output("Vision"))],
    }
}

/// Documents written by one store instance are visible to a new instance
/// over the same root, as after a process restart.
#[test]
fn test_documents_survive_reopen() {
    let temp = tempdir().unwrap();

    let id = {
        let store = SessionStore::file(temp.path());
        let id = store.create_session().unwrap();
        store.save(&id, &sample_workflow()).unwrap();
        store
            .save(
                &id,
                &SimulationState {
                    current_step: 1,
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .save(
                &id,
                &ArtifactBundle {
                    backend_code: Some(vec![CodeFile::new("src/main.rs", "rust", "fn main() {}")]),
                    ..Default::default()
                },
            )
            .unwrap();
        id
    };

    let reopened = SessionStore::file(temp.path());
    assert_eq!(reopened.sessions().unwrap(), vec![id.clone()]);

    let workflow: WorkflowData = reopened.load(&id).unwrap().unwrap();
    assert_eq!(workflow, sample_workflow());

    let state: SimulationState = reopened.load(&id).unwrap().unwrap();
    assert_eq!(state.current_step, 1);

    let bundle: ArtifactBundle = reopened.load(&id).unwrap().unwrap();
    assert_eq!(bundle.backend_code.map(|c| c.len()), Some(1));

    let summary = reopened.summary(&id).unwrap();
    assert_eq!(summary.documents, vec!["artifact", "simulation", "workflow"]);
}

#[test]
fn test_clear_removes_session() {
    let temp = tempdir().unwrap();
    let store = SessionStore::file(temp.path());
    let id = store.create_session().unwrap();
    store.save(&id, &sample_workflow()).unwrap();

    assert!(store.clear(&id).unwrap());
    assert!(!store.exists(&id).unwrap());
    assert!(matches!(store.summary(&id), Err(StoreError::SessionNotFound(_))));
}

#[test]
fn test_stored_envelope_shape() {
    let temp = tempdir().unwrap();
    let store = SessionStore::file(temp.path());
    let id = store.create_session().unwrap();
    store.save(&id, &SimulationState::default()).unwrap();

    let raw = std::fs::read_to_string(
        temp.path()
            .join(".flowmaster/sessions")
            .join(&id)
            .join("simulation.json"),
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], 1);
    assert!(value["savedAt"].is_string());
    assert_eq!(value["data"]["currentStep"], 0);
    assert_eq!(value["data"]["isComplete"], false);
}

fn playback_roster() -> Vec<Agent> {
    (0..7)
        .map(|i| {
            PhaseType::ORDER.iter().fold(
                Agent::new(i + 1, format!("Agent {}", i), "role", "#123456"),
                |agent, phase_type| agent.with_phase(Phase::new(*phase_type).with_output("done")),
            )
        })
        .collect()
}

fn spawn_playback(store: &SessionStore, id: &str) -> PlaybackHandle {
    let machine = PlaybackMachine::new(
        playback_roster(),
        PlaybackOptions::default()
            .with_profile(PacingProfile::Instant)
            .with_auto_approve(true),
    );
    let handle = PlaybackSession::spawn(machine, Arc::new(store.simulation_sink(id).unwrap()));
    handle.start().unwrap();
    handle
}

/// A stopped playback never writes again, so discarding its progress or the
/// whole session sticks.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopped_playback_does_not_write_back() {
    let temp = tempdir().unwrap();
    let store = SessionStore::file(temp.path());

    for _ in 0..25 {
        let id = store.create_session().unwrap();
        let handle = spawn_playback(&store, &id);
        handle.wait_until(|s| !s.state.messages.is_empty()).await.unwrap();
        handle.stop().await;
        store.remove::<SimulationState>(&id).unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(store.load::<SimulationState>(&id).unwrap().is_none());

        let handle = spawn_playback(&store, &id);
        handle.wait_until(|s| !s.state.messages.is_empty()).await.unwrap();
        handle.stop().await;
        assert!(store.clear(&id).unwrap());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!store.exists(&id).unwrap());
    }
}
