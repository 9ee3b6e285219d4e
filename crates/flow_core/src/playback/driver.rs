//! Async driver for [`PlaybackMachine`].
//!
//! One tokio task per playback owns the machine. Commands arrive over an
//! mpsc channel, the single pending delay is a cancellable `sleep_until`,
//! and every processed event publishes a fresh [`PlaybackSnapshot`] on a
//! watch channel.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::machine::{PlaybackEffect, PlaybackEvent, PlaybackMachine, PlaybackSnapshot};
use crate::error::{CoreError, CoreResult};
use crate::models::SimulationState;

/// Destination for persisted simulation state.
#[async_trait]
pub trait SimulationSink: Send + Sync {
    async fn persist(&self, state: &SimulationState) -> CoreResult<()>;
}

/// Sink that discards every state.
pub struct NullSink;

#[async_trait]
impl SimulationSink for NullSink {
    async fn persist(&self, _state: &SimulationState) -> CoreResult<()> {
        Ok(())
    }
}

enum Command {
    Event(PlaybackEvent),
    /// Approval that reports whether it resolved the gate.
    Approve(usize, oneshot::Sender<bool>),
    Shutdown,
}

/// Spawns playback tasks.
pub struct PlaybackSession;

impl PlaybackSession {
    /// Move `machine` onto its own task. Emission begins on [`PlaybackHandle::start`].
    pub fn spawn(machine: PlaybackMachine, sink: Arc<dyn SimulationSink>) -> PlaybackHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());
        let task = tokio::spawn(run(machine, sink, rx, snapshot_tx));
        PlaybackHandle {
            tx,
            snapshot: snapshot_rx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

/// Cloneable control handle for a running playback.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PlaybackHandle {
    fn send(&self, event: PlaybackEvent) -> CoreResult<()> {
        self.tx
            .send(Command::Event(event))
            .map_err(|_| CoreError::PlaybackClosed)
    }

    pub fn start(&self) -> CoreResult<()> {
        self.send(PlaybackEvent::Start)
    }

    /// Approve the gate after agent `step`. Ignored unless that gate is pending.
    pub fn approve_step(&self, step: usize) -> CoreResult<()> {
        self.send(PlaybackEvent::ApprovalGranted(step))
    }

    /// Approve the gate after agent `step` and wait for the outcome.
    ///
    /// Returns `true` only when this call resolved a pending gate.
    pub async fn approve(&self, step: usize) -> CoreResult<bool> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(Command::Approve(step, reply))
            .map_err(|_| CoreError::PlaybackClosed)?;
        outcome.await.map_err(|_| CoreError::PlaybackClosed)
    }

    pub fn set_paused(&self, paused: bool) -> CoreResult<()> {
        self.send(PlaybackEvent::PauseToggled(paused))
    }

    pub fn set_auto_approve(&self, enabled: bool) -> CoreResult<()> {
        self.send(PlaybackEvent::AutoApproveChanged(enabled))
    }

    /// Ask the task to stop without waiting for it.
    /// Further commands fail with [`CoreError::PlaybackClosed`].
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    /// Stop the task and wait until it has exited.
    ///
    /// Once this returns the sink receives no further writes, so callers may
    /// safely discard or replace the persisted state.
    pub async fn stop(&self) {
        self.shutdown();
        let task = self.task.lock().take();
        match task {
            Some(task) => {
                if let Err(e) = task.await {
                    warn!("Playback task ended abnormally: {}", e);
                }
            }
            // Another clone is joining; the receiver drops when the task returns.
            None => self.tx.closed().await,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    pub async fn wait_until<F>(&self, mut predicate: F) -> CoreResult<PlaybackSnapshot>
    where
        F: FnMut(&PlaybackSnapshot) -> bool,
    {
        let mut rx = self.snapshot.clone();
        loop {
            {
                let current = rx.borrow_and_update();
                if predicate(&current) {
                    return Ok(current.clone());
                }
            }
            rx.changed().await.map_err(|_| CoreError::PlaybackClosed)?;
        }
    }
}

async fn run(
    mut machine: PlaybackMachine,
    sink: Arc<dyn SimulationSink>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        // Commands win over a timer that is ready at the same time.
        let (event, reply) = tokio::select! {
            biased;
            command = rx.recv() => match command {
                Some(Command::Event(event)) => (event, None),
                Some(Command::Approve(step, reply)) => (PlaybackEvent::ApprovalGranted(step), Some(reply)),
                Some(Command::Shutdown) | None => break,
            },
            _ = timer => {
                deadline = None;
                (PlaybackEvent::TimerFired, None)
            }
        };

        let effects = machine.handle(event);
        let resolved = effects
            .iter()
            .any(|effect| matches!(effect, PlaybackEffect::ApprovalResolved(_)));

        for effect in effects {
            match effect {
                PlaybackEffect::Emit(message) => {
                    debug!("Emitted {} ({})", message.id, message.phase.phase_type);
                }
                PlaybackEffect::ScheduleTimer(delay) => deadline = Some(Instant::now() + delay),
                PlaybackEffect::CancelTimer => deadline = None,
                PlaybackEffect::AwaitApproval(step) => info!("Awaiting approval for step {}", step),
                PlaybackEffect::ApprovalResolved(step) => info!("Step {} approved", step),
                PlaybackEffect::Persist(state) => {
                    if let Err(e) = sink.persist(&state).await {
                        warn!("Failed to persist simulation state: {}", e);
                    }
                }
                PlaybackEffect::Completed => info!("Playback complete"),
            }
        }

        snapshot_tx.send_replace(machine.snapshot());
        if let Some(reply) = reply {
            let _ = reply.send(resolved);
        }
    }

    debug!("Playback task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Agent, Phase, PhaseType};
    use crate::pacing::PacingProfile;
    use crate::playback::machine::{PlaybackOptions, PlaybackStatus};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        states: Mutex<Vec<SimulationState>>,
    }

    #[async_trait]
    impl SimulationSink for RecordingSink {
        async fn persist(&self, state: &SimulationState) -> CoreResult<()> {
            self.states.lock().push(state.clone());
            Ok(())
        }
    }

    fn roster(n: usize) -> Vec<Agent> {
        (0..n)
            .map(|i| {
                PhaseType::ORDER.iter().fold(
                    Agent::new(i as u32 + 1, format!("Agent {}", i), "role", "#000"),
                    |agent, phase_type| agent.with_phase(Phase::new(*phase_type)),
                )
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_gates_and_completes() {
        let sink = Arc::new(RecordingSink::default());
        let machine = PlaybackMachine::new(
            roster(2),
            PlaybackOptions::default().with_profile(PacingProfile::Brisk).with_seed(3),
        );
        let handle = PlaybackSession::spawn(machine, sink.clone());
        handle.start().unwrap();

        let gated = handle.wait_until(|s| s.pending_approval == Some(0)).await.unwrap();
        assert_eq!(gated.state.messages.len(), 4);
        assert_eq!(gated.status, PlaybackStatus::AwaitingApproval);

        handle.approve_step(0).unwrap();
        let done = handle.wait_until(|s| s.state.is_complete).await.unwrap();
        assert_eq!(done.state.messages.len(), 8);

        let last = sink.states.lock().last().cloned().unwrap();
        assert!(last.is_complete);
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_emission() {
        let machine = PlaybackMachine::new(
            roster(1),
            PlaybackOptions::default().with_profile(PacingProfile::Deliberate),
        );
        let handle = PlaybackSession::spawn(machine, Arc::new(NullSink));
        handle.start().unwrap();
        handle.wait_until(|s| s.state.messages.len() == 1).await.unwrap();

        handle.set_paused(true).unwrap();
        handle.wait_until(|s| s.status == PlaybackStatus::Paused).await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(handle.snapshot().state.messages.len(), 1);

        handle.set_paused(false).unwrap();
        let done = handle.wait_until(|s| s.state.is_complete).await.unwrap();
        assert_eq!(done.state.messages.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_approve_toggle_releases_gate() {
        let machine = PlaybackMachine::new(
            roster(3),
            PlaybackOptions::default().with_profile(PacingProfile::Instant),
        );
        let handle = PlaybackSession::spawn(machine, Arc::new(NullSink));
        handle.start().unwrap();
        handle.wait_until(|s| s.pending_approval == Some(0)).await.unwrap();

        handle.set_auto_approve(true).unwrap();
        let done = handle.wait_until(|s| s.state.is_complete).await.unwrap();
        assert!(done.auto_approve);
        assert_eq!(done.state.messages.len(), 12);
    }

    #[tokio::test]
    async fn test_approve_reports_whether_gate_was_resolved() {
        let machine = PlaybackMachine::new(
            roster(3),
            PlaybackOptions::default().with_profile(PacingProfile::Instant),
        );
        let handle = PlaybackSession::spawn(machine, Arc::new(NullSink));
        handle.start().unwrap();
        handle.wait_until(|s| s.pending_approval == Some(0)).await.unwrap();

        assert!(!handle.approve(1).await.unwrap());
        assert!(handle.approve(0).await.unwrap());
        assert_ne!(handle.snapshot().pending_approval, Some(0));
        assert!(!handle.approve(0).await.unwrap());

        handle.stop().await;
        assert!(matches!(handle.approve(1).await, Err(CoreError::PlaybackClosed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_waits_for_last_write() {
        for _ in 0..20 {
            let sink = Arc::new(RecordingSink::default());
            let machine = PlaybackMachine::new(
                roster(7),
                PlaybackOptions::default()
                    .with_profile(PacingProfile::Instant)
                    .with_auto_approve(true),
            );
            let handle = PlaybackSession::spawn(machine, sink.clone());
            handle.start().unwrap();
            handle.wait_until(|s| !s.state.messages.is_empty()).await.unwrap();

            handle.stop().await;
            assert!(handle.is_closed());
            let written = sink.states.lock().len();
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert_eq!(sink.states.lock().len(), written);
        }
    }

    #[tokio::test]
    async fn test_stop_from_two_clones() {
        let handle = PlaybackSession::spawn(
            PlaybackMachine::new(roster(2), PlaybackOptions::default()),
            Arc::new(NullSink),
        );
        let other = handle.clone();
        tokio::join!(handle.stop(), other.stop());
        assert!(matches!(other.start(), Err(CoreError::PlaybackClosed)));
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let handle = PlaybackSession::spawn(
            PlaybackMachine::new(roster(1), PlaybackOptions::default()),
            Arc::new(NullSink),
        );
        handle.shutdown();
        handle.wait_until(|_| false).await.unwrap_err();
        assert!(matches!(handle.start(), Err(CoreError::PlaybackClosed)));
    }
}
