//! Pure playback state machine.
//!
//! The machine owns no timers and performs no I/O. Each call to
//! [`PlaybackMachine::handle`] applies one [`PlaybackEvent`] and returns the
//! [`PlaybackEffect`]s the driver must carry out.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Agent, Message, SimulationState};
use crate::pacing::PacingProfile;

/// Construction options.
#[derive(Debug, Clone, Default)]
pub struct PlaybackOptions {
    pub profile: PacingProfile,
    pub auto_approve: bool,
    /// Fixed RNG seed for reproducible delays.
    pub seed: Option<u64>,
}

impl PlaybackOptions {
    pub fn with_profile(mut self, profile: PacingProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Begin or resume emission.
    Start,
    /// The delay scheduled by the last `ScheduleTimer` elapsed.
    TimerFired,
    /// Approve the gate after agent `k`.
    ApprovalGranted(usize),
    /// Set the pause flag.
    PauseToggled(bool),
    /// Set the auto-approve flag.
    AutoApproveChanged(bool),
}

/// Work the driver must perform after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    Emit(Message),
    ScheduleTimer(Duration),
    CancelTimer,
    AwaitApproval(usize),
    ApprovalResolved(usize),
    Persist(SimulationState),
    Completed,
}

/// Externally visible status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Idle,
    Emitting,
    AwaitingApproval,
    Paused,
    Complete,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// Point-in-time view of a playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    #[serde(flatten)]
    pub state: SimulationState,
    pub status: PlaybackStatus,
    pub pending_approval: Option<usize>,
    pub auto_approve: bool,
    pub total_agents: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Emitting,
    AwaitingApproval(usize),
    Complete,
}

/// Replays agents and their phases as a message feed.
pub struct PlaybackMachine {
    agents: Vec<Agent>,
    state: SimulationState,
    stage: Stage,
    /// Agent index and next phase index to consider.
    cursor: (usize, usize),
    pending_approval: Option<usize>,
    auto_approve: bool,
    counter: u64,
    timer_armed: bool,
    restored: bool,
    profile: PacingProfile,
    rng: StdRng,
}

impl PlaybackMachine {
    /// Start a fresh playback.
    pub fn new(agents: Vec<Agent>, options: PlaybackOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            agents,
            state: SimulationState::default(),
            stage: Stage::Idle,
            cursor: (0, 0),
            pending_approval: None,
            auto_approve: options.auto_approve,
            counter: 0,
            timer_armed: false,
            restored: false,
            profile: options.profile,
            rng,
        }
    }

    /// Resume from a persisted state when one exists and there are agents to
    /// replay; otherwise start fresh.
    pub fn restore(agents: Vec<Agent>, saved: Option<SimulationState>, options: PlaybackOptions) -> Self {
        let mut machine = Self::new(agents, options);
        let Some(saved) = saved else { return machine };
        if machine.agents.is_empty() {
            return machine;
        }

        machine.counter = saved.messages.len() as u64;
        machine.cursor = (saved.current_step, 0);
        machine.restored = true;
        if saved.is_complete || saved.current_step >= machine.agents.len() {
            machine.stage = Stage::Complete;
        }
        debug!(
            "Restored playback at step {} with {} messages",
            saved.current_step,
            saved.messages.len()
        );
        machine.state = saved;
        if machine.stage == Stage::Complete {
            machine.state.is_complete = true;
        }
        machine
    }

    /// Whether a persisted state was adopted.
    pub fn was_restored(&self) -> bool {
        self.restored
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn pending_approval(&self) -> Option<usize> {
        self.pending_approval
    }

    pub fn auto_approve(&self) -> bool {
        self.auto_approve
    }

    pub fn status(&self) -> PlaybackStatus {
        match self.stage {
            Stage::Complete => PlaybackStatus::Complete,
            Stage::Idle => PlaybackStatus::Idle,
            _ if self.state.is_paused => PlaybackStatus::Paused,
            Stage::Emitting => PlaybackStatus::Emitting,
            Stage::AwaitingApproval(_) => PlaybackStatus::AwaitingApproval,
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state.clone(),
            status: self.status(),
            pending_approval: self.pending_approval,
            auto_approve: self.auto_approve,
            total_agents: self.agents.len(),
        }
    }

    /// Apply one event.
    pub fn handle(&mut self, event: PlaybackEvent) -> Vec<PlaybackEffect> {
        let mut effects = Vec::new();
        let before = self.persisted_tuple();

        match event {
            PlaybackEvent::Start => self.on_start(&mut effects),
            PlaybackEvent::TimerFired => self.on_timer(&mut effects),
            PlaybackEvent::ApprovalGranted(step) => self.on_approval(step, &mut effects),
            PlaybackEvent::PauseToggled(paused) => self.on_pause(paused, &mut effects),
            PlaybackEvent::AutoApproveChanged(enabled) => {
                self.auto_approve = enabled;
                if enabled {
                    if let Some(step) = self.pending_approval {
                        self.on_approval(step, &mut effects);
                    }
                }
            }
        }

        if self.persisted_tuple() != before {
            effects.push(PlaybackEffect::Persist(self.state.clone()));
        }
        effects
    }

    fn persisted_tuple(&self) -> (usize, usize, bool, bool) {
        (
            self.state.current_step,
            self.state.messages.len(),
            self.state.is_complete,
            self.state.is_paused,
        )
    }

    fn on_start(&mut self, effects: &mut Vec<PlaybackEffect>) {
        if self.stage != Stage::Idle || self.agents.is_empty() {
            return;
        }
        self.stage = Stage::Emitting;
        self.advance(effects);
    }

    fn on_timer(&mut self, effects: &mut Vec<PlaybackEffect>) {
        if !self.timer_armed {
            return;
        }
        self.timer_armed = false;
        if self.stage == Stage::Emitting {
            self.advance(effects);
        }
    }

    fn on_approval(&mut self, step: usize, effects: &mut Vec<PlaybackEffect>) {
        if self.pending_approval != Some(step) {
            return;
        }
        self.pending_approval = None;
        effects.push(PlaybackEffect::ApprovalResolved(step));
        self.cursor = (step + 1, 0);
        self.stage = Stage::Emitting;
        self.advance(effects);
    }

    fn on_pause(&mut self, paused: bool, effects: &mut Vec<PlaybackEffect>) {
        if self.state.is_paused == paused {
            return;
        }
        self.state.is_paused = paused;
        if paused {
            if self.timer_armed {
                self.timer_armed = false;
                effects.push(PlaybackEffect::CancelTimer);
            }
        } else if self.stage == Stage::Emitting && !self.timer_armed {
            self.advance(effects);
        }
    }

    /// Emit the next phase, open an approval gate, or complete.
    fn advance(&mut self, effects: &mut Vec<PlaybackEffect>) {
        loop {
            if self.state.is_paused {
                return;
            }
            let (step, from_phase) = self.cursor;
            if step >= self.agents.len() {
                self.complete(effects);
                return;
            }
            self.state.current_step = step;

            match self.next_phase(step, from_phase) {
                Some(phase_index) => {
                    self.cursor = (step, phase_index + 1);
                    let Some(message) = Message::for_phase(step, &self.agents[step], phase_index, self.counter)
                    else {
                        continue;
                    };
                    self.counter += 1;
                    let phase_type = message.phase.phase_type;
                    self.state.messages.push(message.clone());
                    effects.push(PlaybackEffect::Emit(message));

                    let delay = self.profile.delay_for(phase_type, &mut self.rng);
                    self.timer_armed = true;
                    effects.push(PlaybackEffect::ScheduleTimer(delay));
                    return;
                }
                None => {
                    let is_last = step + 1 == self.agents.len();
                    if is_last {
                        self.complete(effects);
                        return;
                    }
                    if self.auto_approve {
                        self.cursor = (step + 1, 0);
                        continue;
                    }
                    self.pending_approval = Some(step);
                    self.stage = Stage::AwaitingApproval(step);
                    effects.push(PlaybackEffect::AwaitApproval(step));
                    return;
                }
            }
        }
    }

    /// First phase index at or after `from` with no message yet.
    fn next_phase(&self, step: usize, from: usize) -> Option<usize> {
        let agent = &self.agents[step];
        (from..agent.phases.len()).find(|&index| !self.is_emitted(agent, index))
    }

    /// A phase counts as emitted when a message with the same agent name,
    /// phase index and phase type exists.
    fn is_emitted(&self, agent: &Agent, phase_index: usize) -> bool {
        let phase_type = agent.phases[phase_index].phase_type;
        self.state.messages.iter().any(|m| {
            m.agent_name == agent.agent && m.phase_index == phase_index && m.phase.phase_type == phase_type
        })
    }

    fn complete(&mut self, effects: &mut Vec<PlaybackEffect>) {
        if self.stage == Stage::Complete {
            return;
        }
        self.stage = Stage::Complete;
        self.state.is_complete = true;
        self.pending_approval = None;
        effects.push(PlaybackEffect::Completed);
    }
}
