//! Collaborator seams for audio, haptic and notification side effects.
//!
//! The engine only emits signals through these traits; rendering, sound
//! synthesis and notification delivery live outside the core. All calls are
//! fire-and-forget: a failing collaborator must degrade to a no-op, never
//! interrupt the state machine or lose the countdown.

use serde::{Deserialize, Serialize};

use crate::catalog::Mode;

/// Audible/haptic cue kinds emitted on state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cue {
    Start,
    Pause,
    Reset,
    Completed,
    Tick,
}

/// Background ambient audio kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbientTrack {
    #[default]
    Off,
    DeepSpace,
    SereneFlow,
}

/// Plays short transition cues. Fire-and-forget.
pub trait CuePlayer: Send + Sync {
    fn play(&self, cue: Cue);
}

/// Starts/stops the looping ambient track while a session is running.
pub trait AmbientController: Send + Sync {
    fn start(&self, track: AmbientTrack);
    fn stop(&self);
}

/// Delivers a completion notification. Permission handling is the
/// collaborator's problem; the core only gates on the user flag.
pub trait Notifier: Send + Sync {
    fn send(&self, title: &str, body: &str);
}

/// Default collaborator: ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCues;

impl CuePlayer for NullCues {
    fn play(&self, _cue: Cue) {}
}

impl AmbientController for NullCues {
    fn start(&self, _track: AmbientTrack) {}
    fn stop(&self) {}
}

impl Notifier for NullCues {
    fn send(&self, _title: &str, _body: &str) {}
}

/// Body text for the completion notification. Modes with an exact second
/// count report minutes and seconds; nominal modes report whole minutes.
pub fn completion_body(mode: &Mode) -> String {
    match mode.duration_seconds {
        Some(secs) => format!(
            "Your {}m {}s session is complete.",
            secs / 60,
            secs % 60
        ),
        None => format!("Your {} minute session is complete.", mode.minutes as u64),
    }
}
