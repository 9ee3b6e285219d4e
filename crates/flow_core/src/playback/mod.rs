//! Playback engine.
//!
//! [`PlaybackMachine`] is a pure finite-state machine over agents and their
//! phases. [`PlaybackSession`] runs it on a tokio task, turning its effects
//! into timers and persistence calls.

mod driver;
mod machine;

pub use driver::{NullSink, PlaybackHandle, PlaybackSession, SimulationSink};
pub use machine::{
    PlaybackEffect, PlaybackEvent, PlaybackMachine, PlaybackOptions, PlaybackSnapshot, PlaybackStatus,
};
